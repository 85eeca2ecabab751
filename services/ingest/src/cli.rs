use clap::Parser;
use mlsync_common::types::SyncType;

#[derive(Parser, Debug)]
#[command(
    name = "mlsync-ingest",
    about = "Replicate RESO listing catalogs into Postgres"
)]
pub struct Cli {
    /// Stop after this many properties
    #[arg(long)]
    pub limit: Option<u64>,

    /// Catalog to sync (IDX or VOW)
    #[arg(long = "type", default_value = "IDX", conflicts_with = "all")]
    pub sync_type: SyncType,

    /// Rewind the catalog to its start cursor before syncing
    #[arg(long)]
    pub reset: bool,

    /// Sync IDX then VOW
    #[arg(long)]
    pub all: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_idx() {
        let cli = Cli::try_parse_from(["mlsync-ingest"]).unwrap();
        assert_eq!(cli.sync_type, SyncType::Idx);
        assert_eq!(cli.limit, None);
        assert!(!cli.reset);
        assert!(!cli.all);
    }

    #[test]
    fn parses_type_case_insensitively() {
        let cli = Cli::try_parse_from(["mlsync-ingest", "--type=vow", "--limit=25", "--reset"])
            .unwrap();
        assert_eq!(cli.sync_type, SyncType::Vow);
        assert_eq!(cli.limit, Some(25));
        assert!(cli.reset);
    }

    #[test]
    fn rejects_unknown_type() {
        assert!(Cli::try_parse_from(["mlsync-ingest", "--type=COMMERCIAL"]).is_err());
    }

    #[test]
    fn rejects_negative_limit() {
        assert!(Cli::try_parse_from(["mlsync-ingest", "--limit=-1"]).is_err());
    }

    #[test]
    fn all_conflicts_with_explicit_type() {
        assert!(Cli::try_parse_from(["mlsync-ingest", "--all", "--type=VOW"]).is_err());
        let cli = Cli::try_parse_from(["mlsync-ingest", "--all"]).unwrap();
        assert!(cli.all);
    }
}
