use std::path::PathBuf;

use argh::FromArgs;

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "rune mint client for bitcoind descriptor wallets")]
pub(crate) struct Args {
    #[argh(
        option,
        short = 'c',
        default = "PathBuf::from(\"config.toml\")",
        description = "path to the TOML config file"
    )]
    pub config: PathBuf,

    #[argh(
        option,
        short = 'n',
        description = "number of mints to complete, overrides the config"
    )]
    pub count: Option<u64>,

    #[argh(
        option,
        short = 'r',
        description = "rune id to mint in block:tx form, overrides the config"
    )]
    pub rune: Option<String>,

    #[argh(
        option,
        short = 'f',
        description = "fixed fee rate in sat/vB, overrides the config and the fee oracle"
    )]
    pub fee_rate: Option<u64>,
}
