//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::Authenticated;
use crate::Result;
use crate::command::Command;
use crate::parser::{Fragment, Response};

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends `GETQUOTAROOT` for `mailbox` and returns the raw reply.
    ///
    /// The reply is a [`Fragment::Sequence`] holding one entry per untagged
    /// `QUOTAROOT` or `QUOTA` response, in the order the server sent them.
    /// Interpreting the resource figures is left to the caller.
    pub async fn get_quota_root(&mut self, mailbox: &str) -> Result<Fragment> {
        let responses = self
            .execute(&Command::GetQuotaRoot {
                mailbox: mailbox.to_string(),
            })
            .await?;

        Self::check_tagged_ok(&responses)?;

        let data = responses
            .into_iter()
            .filter_map(|response| match response {
                Response::Untagged {
                    status: None, data, ..
                } if data
                    .keyword()
                    .is_some_and(|k| k.eq_ignore_ascii_case("QUOTAROOT") || k.eq_ignore_ascii_case("QUOTA")) =>
                {
                    Some(data)
                }
                _ => None,
            })
            .collect();

        Ok(Fragment::Sequence(data))
    }
}
