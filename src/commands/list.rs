//! `tnscli list`

use super::Context;
use crate::error::TnsResult;
use crate::tns::format::{search_pattern, write_entries};
use crate::tns::TnsEntries;
use clap::Args;
use std::io::Write;

#[derive(Args, Debug, Default)]
pub struct ListArgs {
    /// Case-insensitive regex on alias names
    #[arg(long, short = 's')]
    pub search: Option<String>,

    /// Print the full descriptor of each alias
    #[arg(long, short = 'c')]
    pub complete: bool,
}

pub fn execute(args: ListArgs, ctx: &Context) -> TnsResult<()> {
    let entries = ctx.load_entries()?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let count = list_entries(&mut out, &entries, &args)?;
    out.flush()?;
    log::info!("{} of {} aliases listed", count, entries.len());
    Ok(())
}

/// Writes the selected aliases in sorted order
pub fn list_entries<W: Write>(
    out: &mut W,
    entries: &TnsEntries,
    args: &ListArgs,
) -> TnsResult<usize> {
    let filter = args.search.as_deref().map(search_pattern).transpose()?;
    write_entries(out, entries.iter(), args.complete, filter.as_ref())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tns::TnsEntry;

    fn entries() -> TnsEntries {
        ["XE.local", "ORCL", "DB_T"]
            .into_iter()
            .map(|n| TnsEntry::new(n, "(DESCRIPTION=(ADDRESS=(HOST=h)(PORT=1521)))", "f:1"))
            .collect()
    }

    #[test]
    fn test_list_sorted() {
        let mut buf = Vec::new();
        let n = list_entries(&mut buf, &entries(), &ListArgs::default()).unwrap();
        assert_eq!(n, 3);
        assert_eq!(String::from_utf8(buf).unwrap(), "DB_T\nORCL\nXE.local\n");
    }

    #[test]
    fn test_list_search_complete() {
        let args = ListArgs {
            search: Some("orcl".into()),
            complete: true,
        };
        let mut buf = Vec::new();
        list_entries(&mut buf, &entries(), &args).unwrap();
        assert!(String::from_utf8(buf).unwrap().starts_with("ORCL=  (DESCRIPTION="));
    }
}
