use crate::config::ShellConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    project: Option<PathBuf>,
    tick_interval_ms: Option<u64>,
    max_ticks: Option<usize>,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            if !flag.starts_with("--") {
                bail!("Unexpected argument '{flag}'. Use --project/--tick-interval/--max-ticks with values.");
            }
            let key = &flag[2..];
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "project" => {
                    parsed.project = Some(PathBuf::from(value));
                }
                "tick-interval" => {
                    parsed.tick_interval_ms = Some(
                        value
                            .parse::<u64>()
                            .with_context(|| format!("Invalid tick interval '{value}'"))?,
                    );
                }
                "max-ticks" => {
                    parsed.max_ticks = Some(
                        value.parse::<usize>().with_context(|| format!("Invalid tick count '{value}'"))?,
                    );
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --project, --tick-interval, --max-ticks."),
            }
        }
        Ok(parsed)
    }

    pub fn project(&self) -> Option<&PathBuf> {
        self.project.as_ref()
    }

    pub fn into_config_overrides(self) -> ShellConfigOverrides {
        ShellConfigOverrides { tick_interval_ms: self.tick_interval_ms, max_ticks: self.max_ticks }
    }

    #[cfg(test)]
    fn as_tuple(&self) -> (Option<&str>, Option<u64>, Option<usize>) {
        (self.project.as_ref().and_then(|p| p.to_str()), self.tick_interval_ms, self.max_ticks)
    }
}
