use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use core::time::Duration;
use nodeflake::{
    DEFAULT_BACKWARD_WAIT_MULTIPLIER, DEFAULT_EPOCH, DEFAULT_MAX_BACKWARD_MS, ExhaustionStrategy,
    GeneratorConfig, RollbackPolicy,
};

/// Upper bound on the number of IDs issued by a single `generate` run.
pub const MAX_COUNT: u64 = 1_000_000_000;

/// Command-line arguments for the `nodeflake` binary.
///
/// Every generator setting can also be supplied through an environment
/// variable, and a `.env` file in the working directory is loaded before
/// parsing.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "nodeflake",
    version,
    about = "Issue and decode coordination-free Snowflake IDs"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Issue IDs for one node identity and print them, one per line.
    Generate(GenerateArgs),
    /// Split IDs into timestamp, datacenter, worker and sequence.
    Decode(DecodeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Datacenter ID encoded into every ID (0-31).
    ///
    /// Environment variable: `NODEFLAKE_DATACENTER_ID`
    #[arg(long, env = "NODEFLAKE_DATACENTER_ID", default_value_t = 0)]
    pub datacenter_id: u64,

    /// Worker ID encoded into every ID (0-31).
    ///
    /// Environment variable: `NODEFLAKE_WORKER_ID`
    #[arg(long, env = "NODEFLAKE_WORKER_ID", default_value_t = 0)]
    pub worker_id: u64,

    /// Number of IDs to issue.
    ///
    /// Environment variable: `NODEFLAKE_COUNT`
    #[arg(short = 'n', long, env = "NODEFLAKE_COUNT", default_value_t = 1)]
    pub count: u64,

    /// Epoch as milliseconds since 1970-01-01 UTC. Defaults to
    /// 2020-01-01T00:00:00Z.
    ///
    /// Environment variable: `NODEFLAKE_EPOCH_MS`
    #[arg(long, env = "NODEFLAKE_EPOCH_MS")]
    pub epoch_ms: Option<u64>,

    /// Largest backward clock jump, in milliseconds, that is waited out.
    ///
    /// Environment variable: `NODEFLAKE_MAX_BACKWARD_MS`
    #[arg(long, env = "NODEFLAKE_MAX_BACKWARD_MS", default_value_t = DEFAULT_MAX_BACKWARD_MS)]
    pub max_backward_ms: u64,

    /// What to do when the clock moves back further than the tolerance.
    ///
    /// Environment variable: `NODEFLAKE_ROLLBACK_POLICY`
    #[arg(long, env = "NODEFLAKE_ROLLBACK_POLICY", value_enum, default_value_t = RollbackPolicyArg::Fail)]
    pub rollback_policy: RollbackPolicyArg,

    /// How to wait once 4096 IDs have been issued within one millisecond.
    ///
    /// Environment variable: `NODEFLAKE_EXHAUSTION`
    #[arg(long, env = "NODEFLAKE_EXHAUSTION", value_enum, default_value_t = ExhaustionArg::Spin)]
    pub exhaustion: ExhaustionArg,

    /// Print IDs zero-padded to 20 digits so they sort as strings.
    #[arg(long, default_value_t = false)]
    pub padded: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DecodeArgs {
    /// IDs to decode. Any 64-bit integer is accepted.
    #[arg(required = true, num_args = 1.., allow_negative_numbers = true)]
    pub ids: Vec<i64>,

    /// Print one JSON object per ID instead of a table row.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollbackPolicyArg {
    /// Report the rollback as an error and stop.
    Fail,
    /// Abort the process.
    Panic,
}

impl From<RollbackPolicyArg> for RollbackPolicy {
    fn from(arg: RollbackPolicyArg) -> Self {
        match arg {
            RollbackPolicyArg::Fail => Self::Fail,
            RollbackPolicyArg::Panic => Self::Panic,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionArg {
    /// Busy-poll the clock.
    Spin,
    /// Yield the thread between polls.
    Yield,
}

impl From<ExhaustionArg> for ExhaustionStrategy {
    fn from(arg: ExhaustionArg) -> Self {
        match arg {
            ExhaustionArg::Spin => Self::Spin,
            ExhaustionArg::Yield => Self::Yield,
        }
    }
}

/// Validated settings for a `generate` run.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    pub generator: GeneratorConfig,
    pub count: u64,
    pub padded: bool,
}

impl TryFrom<GenerateArgs> for GenerateConfig {
    type Error = anyhow::Error;

    fn try_from(args: GenerateArgs) -> Result<Self, Self::Error> {
        if args.count == 0 {
            bail!("NODEFLAKE_COUNT must be greater than 0");
        }

        if args.count > MAX_COUNT {
            bail!(
                "NODEFLAKE_COUNT ({}) exceeds the maximum of {}",
                args.count,
                MAX_COUNT
            );
        }

        let generator = GeneratorConfig {
            datacenter_id: args.datacenter_id,
            worker_id: args.worker_id,
            epoch: args.epoch_ms.map_or(DEFAULT_EPOCH, Duration::from_millis),
            max_backward_ms: args.max_backward_ms,
            backward_wait_multiplier: DEFAULT_BACKWARD_WAIT_MULTIPLIER,
            rollback_policy: args.rollback_policy.into(),
            exhaustion_strategy: args.exhaustion.into(),
        };
        generator
            .validate()
            .context("invalid generator configuration")?;

        Ok(Self {
            generator,
            count: args.count,
            padded: args.padded,
        })
    }
}
