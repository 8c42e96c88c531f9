use clap::{Parser, ValueEnum};

use crate::core::mode::Mode;

#[derive(Parser)]
#[command(name = "ecomode")]
#[command(version, about = "Toggle power-saving profiles and restore the previous machine state")]
pub struct Cli {
    /// Profile to apply, or `restore` to bring the previous state back
    #[arg(long, value_enum)]
    pub mode: CliMode,

    /// Schedule an automatic restore this many minutes from now (0 = none)
    #[arg(long, default_value_t = 0)]
    pub revert_after_minutes: u32,

    /// Keep Wi-Fi up while power-saver is active (power-saver only)
    #[arg(long)]
    pub enable_wifi: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMode {
    #[value(alias = "PowerSaver")]
    PowerSaver,
    #[value(alias = "UltraSaver")]
    UltraSaver,
    #[value(alias = "Restore")]
    Restore,
}

impl CliMode {
    pub fn to_mode(self) -> Mode {
        match self {
            Self::PowerSaver => Mode::PowerSaver,
            Self::UltraSaver => Mode::UltraSaver,
            Self::Restore => Mode::Restored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_is_required() {
        assert!(Cli::try_parse_from(["ecomode"]).is_err());
    }

    #[test]
    fn test_kebab_and_pascal_spellings() {
        let cli = Cli::try_parse_from(["ecomode", "--mode", "power-saver"]).unwrap();
        assert_eq!(cli.mode, CliMode::PowerSaver);

        let cli = Cli::try_parse_from(["ecomode", "--mode", "UltraSaver"]).unwrap();
        assert_eq!(cli.mode, CliMode::UltraSaver);

        let cli = Cli::try_parse_from(["ecomode", "--mode", "restore"]).unwrap();
        assert_eq!(cli.mode.to_mode(), Mode::Restored);
    }

    #[test]
    fn test_flags_default_off() {
        let cli = Cli::try_parse_from(["ecomode", "--mode", "power-saver"]).unwrap();
        assert_eq!(cli.revert_after_minutes, 0);
        assert!(!cli.enable_wifi);

        let cli = Cli::try_parse_from([
            "ecomode",
            "--mode",
            "power-saver",
            "--enable-wifi",
            "--revert-after-minutes",
            "90",
        ])
        .unwrap();
        assert_eq!(cli.revert_after_minutes, 90);
        assert!(cli.enable_wifi);
    }
}
