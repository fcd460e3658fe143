//! `tnscli creds set|show|delete`

use crate::credentials::{CredentialManager, DEFAULT_PROBE_USER};
use crate::error::TnsResult;
use clap::{Args, Subcommand};

#[derive(Args, Debug)]
pub struct CredsArgs {
    #[command(subcommand)]
    pub command: CredsCommands,
}

#[derive(Subcommand, Debug)]
pub enum CredsCommands {
    /// Store the probe account in the keychain
    Set {
        /// Database user
        user: String,
        /// Password for the user
        password: String,
    },

    /// Show which probe account is stored
    Show,

    /// Remove the stored probe account
    Delete,
}

pub fn execute(args: CredsArgs) -> TnsResult<()> {
    match args.command {
        CredsCommands::Set { user, password } => {
            CredentialManager::set_probe_credentials(&user, &password)?;
            println!("probe credentials stored for {}", user);
        }
        CredsCommands::Show => match CredentialManager::get_probe_credentials() {
            Ok((user, _)) => println!("probe user: {} (password: ********)", user),
            Err(e) => {
                log::debug!("{}", e);
                println!("no probe credentials stored, using {}", DEFAULT_PROBE_USER);
            }
        },
        CredsCommands::Delete => {
            CredentialManager::delete_probe_credentials()?;
            println!("probe credentials deleted");
        }
    }
    Ok(())
}
