use anyhow::Result;
use tracing::{info, warn};

use crate::core::state::AppState;
use crate::wal::wal::WalOperation;

// this runs at boot time
pub fn apply_wal_operations(state: &AppState, operations: &[WalOperation]) -> Result<()> {
    for op in operations {
        match op {
            WalOperation::PutUser { user } => {
                state.users.restore(user.clone());
            }
            WalOperation::PutActivation { activation } => {
                state.activations.restore(activation.clone());
            }
            WalOperation::Activate {
                activation_id,
                user_id,
                at,
            } => {
                let (Some(record), Some(user)) = (
                    state.activations.get(*activation_id),
                    state.users.get(*user_id),
                ) else {
                    warn!(
                        activation_id,
                        user_id, "Activation references a missing row, skipping"
                    );
                    continue;
                };

                let mut user = (*user).clone();
                user.active = true;
                user.promote_to_client();
                state.users.restore(user);

                let mut record = (*record).clone();
                record.activated = true;
                record.updated = *at;
                state.activations.restore(record);
            }
            WalOperation::RemoveUser { user_id } => {
                state.users.remove(*user_id);
                state.activations.remove_for_user(*user_id);
            }
        }
    }

    info!(
        users = state.users.len(),
        activations = state.activations.len(),
        "State restored from WAL"
    );

    Ok(())
}
