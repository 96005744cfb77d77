//! Traits shared by command configuration types

use crate::cli::Cli;
use crate::error::DepVizError;

/// Generic builder trait for configuration objects
pub trait ConfigBuilder: Sized {
    type Config;

    /// Build the configuration, returning an error if validation fails
    fn build(self) -> Result<Self::Config, DepVizError>;
}

/// Configurations that can be created from parsed command-line arguments
pub trait FromCli: Sized {
    fn from_cli(cli: Cli) -> Result<Self, DepVizError>;
}

/// Implement `TryFrom<Cli>` using [`FromCli`]
#[macro_export]
macro_rules! impl_try_from_cli {
    ($config:ty) => {
        impl std::convert::TryFrom<$crate::cli::Cli> for $config {
            type Error = $crate::error::DepVizError;

            fn try_from(cli: $crate::cli::Cli) -> Result<Self, Self::Error> {
                <$config as $crate::common::FromCli>::from_cli(cli)
            }
        }
    };
}
