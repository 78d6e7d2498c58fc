use crate::{Connection, Engine, Record, RequestContext, Result, Statement};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Record, Serialize, Deserialize)]
#[record(name = "flagged_accounts")]
pub struct FlaggedAccount {
    #[record(primary_key)]
    pub user_id: String,
    pub flag_count: i32,
    pub is_suspended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl FlaggedAccount {
    pub async fn find<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
    ) -> Result<FlaggedAccount> {
        engine
            .read_by(ctx, Self::table_name(), "user_id", user_id)
            .await
    }

    /// Report `user_id`: bump its flag count and mirror it on the account, in one transaction.
    pub async fn flag<C: Connection>(
        engine: &Engine<C>,
        ctx: &RequestContext,
        user_id: &str,
        reason: Option<&str>,
    ) -> Result<FlaggedAccount> {
        let mut transaction = engine.begin(ctx).await?;
        let mut flagged = transaction
            .batch_read::<FlaggedAccount>(
                ctx,
                Statement::new("SELECT * FROM flagged_accounts WHERE user_id = $1").bind(user_id),
            )
            .await?;
        let account = match flagged.pop() {
            Some(mut account) => {
                account.flag_count += 1;
                if let Some(reason) = reason {
                    account.reason = Some(reason.into());
                }
                transaction
                    .update(ctx, Self::table_name(), &account, "user_id", user_id)
                    .await?;
                account
            }
            None => {
                let account = FlaggedAccount {
                    user_id: user_id.into(),
                    flag_count: 1,
                    is_suspended: false,
                    reason: reason.map(Into::into),
                };
                transaction
                    .write(ctx, Self::table_name(), &account)
                    .await?;
                account
            }
        };
        transaction
            .execute(
                ctx,
                Statement::new("UPDATE users SET flagged = $1 WHERE user_id = $2")
                    .bind(account.flag_count)
                    .bind(user_id),
            )
            .await?;
        transaction.commit(ctx).await?;
        Ok(account)
    }
}
