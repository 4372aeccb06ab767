use pagewiki_core::format::OutputFormat;

/// Parse `--format`, reporting the accepted values on failure
pub fn parse_format(s: &str) -> Result<OutputFormat, String> {
    s.parse::<OutputFormat>().map_err(|e| e.to_string())
}
