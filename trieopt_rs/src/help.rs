//! Help text rendering.

use crate::handler::OptionHandler;
use crate::parser::OptionParser;
use crate::registry::OptionName;

/// Renders the help message for a parser.
pub trait HelpFormatter {
    fn format(&self, parser: &OptionParser) -> String;
}

/// Option strings on the left, help text aligned in a column on the right.
///
/// ```text
/// Usage: prog [options]
///
/// options:
///   -h, --help            show this help message and exit
///   -fFILE, --file=FILE   input file
/// ```
#[derive(Debug, Clone, Copy)]
pub struct IndentedHelpFormatter {
    pub indent: usize,
    pub max_option_width: usize,
}

impl Default for IndentedHelpFormatter {
    fn default() -> Self {
        Self {
            indent: 2,
            max_option_width: 20,
        }
    }
}

impl IndentedHelpFormatter {
    /// Short strings first, then long; value options show their metavar.
    pub fn format_option_strings(&self, handler: &OptionHandler) -> String {
        let metavar = handler.metavar();
        let mut shorts = Vec::new();
        let mut longs = Vec::new();
        for option_string in handler.option_strings() {
            let is_long = matches!(OptionName::parse(option_string), Some(OptionName::Long(_)));
            let rendered = match (handler.num_args() > 0, is_long) {
                (false, _) => option_string.clone(),
                (true, true) => format!("{option_string}={metavar}"),
                (true, false) => format!("{option_string}{metavar}"),
            };
            if is_long {
                longs.push(rendered);
            } else {
                shorts.push(rendered);
            }
        }
        shorts.extend(longs);
        shorts.join(", ")
    }

    fn help_text(handler: &OptionHandler) -> Option<String> {
        let help = handler.help()?;
        if !help.contains("%default") || !handler.has_value() {
            return Some(help.to_string());
        }
        let current = match handler.value() {
            Ok(Some(value)) => value.to_string(),
            _ => "none".to_string(),
        };
        Some(help.replace("%default", &current))
    }
}

impl HelpFormatter for IndentedHelpFormatter {
    fn format(&self, parser: &OptionParser) -> String {
        let mut out = format!("Usage: {}\n\n", parser.usage_string());
        if let Some(description) = parser.description() {
            out.push_str(description);
            out.push_str("\n\n");
        }
        out.push_str("options:\n");

        let help_column = self.max_option_width + 2 * self.indent;
        for (_, handler) in parser.handlers() {
            let strings = self.format_option_strings(handler);
            out.push_str(&" ".repeat(self.indent));
            out.push_str(&strings);
            if let Some(help) = Self::help_text(handler) {
                if strings.len() > self.max_option_width {
                    out.push('\n');
                    out.push_str(&" ".repeat(help_column));
                } else {
                    out.push_str(&" ".repeat(help_column - self.indent - strings.len()));
                }
                out.push_str(&help);
            }
            out.push('\n');
        }
        out
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::OptionDescriptor;
    use crate::settings::ParserSettings;
    use crate::slot::ValueCell;
    use crate::value::ValueType;

    #[test]
    fn test_option_strings_with_metavar() {
        let mut parser = OptionParser::new(ParserSettings::new().with_prog("tool"));
        let id = parser
            .add_option(OptionDescriptor::new(["--file", "-f"]).help("input"))
            .unwrap();
        let handler = parser.registry().handler(id).unwrap();
        assert_eq!(
            IndentedHelpFormatter::default().format_option_strings(handler),
            "-fFILE, --file=FILE"
        );
    }

    #[test]
    fn test_full_layout() {
        let mut parser = OptionParser::new(
            ParserSettings::new()
                .with_prog("tool")
                .with_description("Does things."),
        );
        parser
            .add_option(
                OptionDescriptor::new(["-n", "--count"])
                    .value_type(ValueType::I32)
                    .slot(ValueCell::with_value(3))
                    .help("how many [default: %default]"),
            )
            .unwrap();
        parser
            .add_option(
                OptionDescriptor::new(["--a-very-long-option-name"])
                    .value_type(ValueType::Bool)
                    .help("wraps"),
            )
            .unwrap();
        let text = parser.help_string();
        let expected = "Usage: tool [options]\n\
                        \n\
                        Does things.\n\
                        \n\
                        options:\n  \
                        -h, --help            show this help message and exit\n  \
                        -nCOUNT, --count=COUNT\n                        how many [default: 3]\n  \
                        --a-very-long-option-name\n                        wraps\n";
        assert_eq!(text, expected);
    }
}
