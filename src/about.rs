pub const PRIMERDESK_DISPLAY_VERSION: &str = env!("PRIMERDESK_DISPLAY_VERSION");
pub const PRIMERDESK_BUILD_N: &str = env!("PRIMERDESK_BUILD_N");

pub fn version_cli_text() -> String {
    format!(
        "primerdesk {}\nBuild {}\nPrimer and probe design front-end for Primer3",
        PRIMERDESK_DISPLAY_VERSION, PRIMERDESK_BUILD_N
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_text_names_build() {
        let text = version_cli_text();
        assert!(text.starts_with("primerdesk "));
        assert!(text.contains(PRIMERDESK_BUILD_N));
    }
}
