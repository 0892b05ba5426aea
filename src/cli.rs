use clap::Parser;

pub const HELP_KEYS: &str = "\
Key Bindings:
  Esc / q       : Quit
  Left / Space  : Previous page
  Right         : Next page
  Home / End    : First / last page
  l             : Toggle paged / continuous view
  Up / Down     : Scroll (continuous view)
  Wheel         : Scroll (continuous view)
  s             : Resize window to the current page
";

#[derive(Parser)]
#[command(name = "cbzv", about = "A viewer for comic book archives", after_help = HELP_KEYS)]
pub struct Cli {
    /// Archive to view (.cbz / .zip)
    pub archive: std::path::PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_exactly_one_archive() {
        assert!(Cli::try_parse_from(["cbzv"]).is_err());
        assert!(Cli::try_parse_from(["cbzv", "a.cbz", "b.cbz"]).is_err());

        let cli = Cli::try_parse_from(["cbzv", "a.cbz"]).unwrap();
        assert_eq!(cli.archive, std::path::PathBuf::from("a.cbz"));
    }
}
