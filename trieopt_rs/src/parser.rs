//! The parser facade.
//!
//! [`OptionParser`] owns the option registry, the converter table, the action
//! factories and the settings. Declare options with
//! [`OptionParser::add_option`], then call [`OptionParser::parse`].

use std::fmt;

use tracing::{debug, warn};

use crate::convert::Converters;
use crate::descriptor::{DescribeOptions, OptionDescriptor, option_string_for};
use crate::error::{Error, ParseError, SetupError};
use crate::handler::{ActionRegistry, Behavior, HandlerFactory, OptionHandler};
use crate::help::{HelpFormatter, IndentedHelpFormatter};
use crate::registry::{ConflictHandler, HandlerId, OptionRegistry};
use crate::scanner;
use crate::settings::{DEFAULT_USAGE, ParserSettings};
use crate::value::{Value, ValueType};
use crate::values::OptionValues;

pub const HELP_TEXT: &str = "show this help message and exit";
pub const VERSION_TEXT: &str = "show program's version number and exit";

pub struct OptionParser {
    pub(crate) registry: OptionRegistry,
    pub(crate) converters: Converters,
    factories: ActionRegistry,
    pub(crate) settings: ParserSettings,
    formatter: Box<dyn HelpFormatter>,
}

impl Default for OptionParser {
    fn default() -> Self {
        Self::new(ParserSettings::default())
    }
}

impl fmt::Debug for OptionParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OptionParser")
            .field("settings", &self.settings)
            .field("registry", &self.registry)
            .field("converters", &self.converters)
            .field("factories", &self.factories)
            .finish()
    }
}

impl OptionParser {
    /// A parser with default converters and actions, plus `-h/--help` and
    /// `--version` as the settings ask for.
    pub fn new(settings: ParserSettings) -> Self {
        let mut parser = Self {
            registry: OptionRegistry::new(),
            converters: Converters::new(),
            factories: ActionRegistry::new(),
            settings,
            formatter: Box::new(IndentedHelpFormatter::default()),
        };
        if parser.settings.add_help_option {
            parser.install_builtin(OptionHandler::new(
                vec!["-h".to_string(), "--help".to_string()],
                0,
                Behavior::Help,
            )
            .with_help(Some(HELP_TEXT.to_string())));
        }
        if let Some(version) = parser.settings.version.clone() {
            let text = version.replace("%prog", &parser.prog());
            parser.install_builtin(
                OptionHandler::new(vec!["--version".to_string()], 0, Behavior::Version { text })
                    .with_help(Some(VERSION_TEXT.to_string())),
            );
        }
        parser
    }

    /// Register a built-in option on a registry that cannot have conflicts yet.
    fn install_builtin(&mut self, handler: OptionHandler) {
        if let Err(err) = self.registry.register(handler) {
            warn!(%err, "built-in option not installed");
        }
    }

    // ========================================================================
    // Declaring options
    // ========================================================================

    /// Build a handler for `descriptor` and register it.
    pub fn add_option(&mut self, mut descriptor: OptionDescriptor) -> Result<HandlerId, SetupError> {
        descriptor.derive_option_strings(self.settings.camel_case_allowed);
        let action = descriptor.effective_action();
        let handler = self.factories.build(descriptor, &self.converters)?;
        let id = self.registry.register(handler)?;
        debug!(id = %id, action = %action, "option added");
        Ok(id)
    }

    /// Add every option `source` describes, stopping at the first failure.
    pub fn add_options(&mut self, source: &impl DescribeOptions) -> Result<Vec<HandlerId>, SetupError> {
        source
            .describe_options()
            .into_iter()
            .map(|descriptor| self.add_option(descriptor))
            .collect()
    }

    /// Register an already built handler.
    pub fn add_handler(&mut self, handler: OptionHandler) -> Result<HandlerId, SetupError> {
        self.registry.register(handler)
    }

    /// Add a help option under custom strings.
    pub fn add_help_option<I, S>(&mut self, help: &str, option_strings: I) -> Result<HandlerId, SetupError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let handler = OptionHandler::new(
            option_strings.into_iter().map(Into::into).collect(),
            0,
            Behavior::Help,
        )
        .with_help(Some(help.to_string()));
        self.registry.register(handler)
    }

    pub fn remove(&mut self, id: HandlerId) -> Option<OptionHandler> {
        self.registry.unregister(id)
    }

    /// Handler for an option string; long options may be abbreviated.
    pub fn option(&self, option_string: &str) -> Option<&OptionHandler> {
        let resolved = self.registry.resolve(option_string).ok()?;
        self.registry.handler(resolved.id)
    }

    /// Exact match only.
    pub fn has_option(&self, option_string: &str) -> bool {
        self.registry.contains(option_string)
    }

    pub fn existing_options<S: AsRef<str>>(&self, option_strings: &[S]) -> Vec<String> {
        self.registry.existing_options(option_strings)
    }

    pub fn handlers(&self) -> impl Iterator<Item = (HandlerId, &OptionHandler)> {
        self.registry.handlers()
    }

    pub fn registry(&self) -> &OptionRegistry {
        &self.registry
    }

    pub fn set_conflict_handler(&mut self, handler: impl ConflictHandler + 'static) {
        self.registry.set_conflict_handler(handler);
    }

    // ========================================================================
    // Conversion and actions
    // ========================================================================

    pub fn converters(&self) -> &Converters {
        &self.converters
    }

    pub fn converters_mut(&mut self) -> &mut Converters {
        &mut self.converters
    }

    /// Register or replace the converter for `ty`.
    pub fn put_converter<F>(&mut self, ty: ValueType, converter: F)
    where
        F: Fn(&str) -> Result<Value, String> + 'static,
    {
        self.converters.insert(ty, converter);
    }

    /// Register or replace the factory behind an action name.
    pub fn put_handler_factory(
        &mut self,
        action: impl Into<String>,
        factory: impl HandlerFactory + 'static,
    ) -> Option<Box<dyn HandlerFactory>> {
        self.factories.insert(action, factory)
    }

    pub fn remove_handler_factory(&mut self, action: &str) -> Option<Box<dyn HandlerFactory>> {
        self.factories.remove(action)
    }

    pub fn handler_factory(&self, action: &str) -> Option<&dyn HandlerFactory> {
        self.factories.get(action)
    }

    // ========================================================================
    // Settings
    // ========================================================================

    pub fn settings(&self) -> &ParserSettings {
        &self.settings
    }

    pub fn prog(&self) -> String {
        self.settings.prog()
    }

    pub fn set_prog(&mut self, prog: impl Into<String>) {
        self.settings.prog = Some(prog.into());
    }

    pub fn set_usage(&mut self, usage: impl Into<String>) {
        self.settings.usage = Some(usage.into());
    }

    pub fn description(&self) -> Option<&str> {
        self.settings.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.settings.description = Some(description.into());
    }

    pub fn set_allow_interspersed_args(&mut self, allow: bool) {
        self.settings.allow_interspersed_args = allow;
    }

    pub fn set_camel_case_allowed(&mut self, allowed: bool) {
        self.settings.camel_case_allowed = allowed;
    }

    pub fn set_help_formatter(&mut self, formatter: impl HelpFormatter + 'static) {
        self.formatter = Box::new(formatter);
    }

    /// Describe the positional arguments in the usage line and, when `exact`,
    /// require exactly `names.len()` of them.
    pub fn set_positional_args(&mut self, description: &str, exact: bool, names: &[&str]) {
        self.settings.usage = Some(format!(
            "{DEFAULT_USAGE} {}\n{description}",
            names.join(" ")
        ));
        self.settings.expected_positionals = exact.then_some(names.len());
    }

    /// Option string a field-style name maps to under the current settings.
    pub fn option_string_for(&self, name: &str) -> String {
        option_string_for(name, self.settings.camel_case_allowed)
    }

    // ========================================================================
    // Output
    // ========================================================================

    /// Usage line with `%prog` substituted.
    pub fn usage_string(&self) -> String {
        self.settings.usage().replace("%prog", &self.prog())
    }

    /// Version line with `%prog` substituted.
    pub fn version_string(&self) -> Option<String> {
        self.settings
            .version
            .as_ref()
            .map(|v| v.replace("%prog", &self.prog()))
    }

    pub fn help_string(&self) -> String {
        self.formatter.format(self)
    }

    // ========================================================================
    // Parsing
    // ========================================================================

    /// Apply `args` (without the program name) to the registered options.
    ///
    /// Help and version requests come back as
    /// [`ParseError::HelpRequested`]/[`ParseError::VersionRequested`].
    pub fn parse<I, S>(&mut self, args: I) -> Result<OptionValues, ParseError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        debug!(count = args.len(), "parsing arguments");
        let positional = scanner::scan(self, args)?;
        Ok(OptionValues::capture(
            &self.registry,
            positional,
            self.settings.camel_case_allowed,
        ))
    }
}

/// Build a parser for `source`, parse `args` and return the positionals.
///
/// Values land in the slots `source` handed out.
pub fn parse_into<D, I, S>(source: &D, args: I) -> Result<Vec<String>, Error>
where
    D: DescribeOptions,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut parser = OptionParser::default();
    parser.add_options(source)?;
    Ok(parser.parse(args)?.into_positional())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LookupError;
    use crate::handler::Callback;
    use crate::registry::ResolveByPruning;
    use crate::slot::ValueCell;
    use crate::value::Shape;

    fn parser() -> OptionParser {
        OptionParser::new(ParserSettings::new().with_prog("test"))
    }

    #[test]
    fn test_help_option_installed() {
        let mut p = parser();
        assert!(p.has_option("-h"));
        assert!(p.has_option("--help"));
        let err = p.parse(["--help"]).unwrap_err();
        let text = err.exit_message().unwrap();
        assert!(text.starts_with("Usage: test [options]"));
        assert_eq!(err.exit_code(), 0);

        let p = OptionParser::new(ParserSettings::new().without_help_option());
        assert!(!p.has_option("-h"));
    }

    #[test]
    fn test_version_substitutes_prog() {
        let mut p = OptionParser::new(
            ParserSettings::new()
                .with_prog("tool")
                .with_version("%prog 2.1"),
        );
        assert_eq!(p.version_string().as_deref(), Some("tool 2.1"));
        let err = p.parse(["--vers"]).unwrap_err();
        assert!(matches!(err, ParseError::VersionRequested { ref text } if text == "tool 2.1"));
    }

    #[test]
    fn test_store_and_defaults() {
        let mut p = parser();
        let mode = ValueCell::with_value("auto");
        p.add_option(OptionDescriptor::new(["-f", "--file"])).unwrap();
        p.add_option(OptionDescriptor::new(["--mode"]).slot(mode.clone()))
            .unwrap();
        let values = p.parse(["-f", "a.txt", "rest"]).unwrap();
        assert_eq!(values.get::<String>("file"), Ok(Some("a.txt".into())));
        assert_eq!(values.get::<String>("mode"), Ok(Some("auto".into())));
        assert_eq!(values.positional(), ["rest"]);
        assert_eq!(mode.get_as::<String>(), Some("auto".into()));
    }

    #[test]
    fn test_named_descriptor_uses_kebab_case() {
        let mut p = parser();
        p.add_option(OptionDescriptor::named("dryRun").value_type(ValueType::Bool))
            .unwrap();
        assert!(p.has_option("--dry-run"));
        let values = p.parse(["--dry-run"]).unwrap();
        assert_eq!(values.get::<bool>("dryRun"), Ok(Some(true)));

        let mut p = OptionParser::new(ParserSettings::new().with_camel_case(true));
        p.add_option(OptionDescriptor::named("dryRun").value_type(ValueType::Bool))
            .unwrap();
        assert!(p.has_option("--dryRun"));
    }

    #[test]
    fn test_conflicts_follow_policy() {
        let mut p = parser();
        p.add_option(OptionDescriptor::new(["-f"])).unwrap();
        assert!(matches!(
            p.add_option(OptionDescriptor::new(["-f", "--force"])),
            Err(SetupError::Conflict { .. })
        ));
        assert!(!p.has_option("--force"));

        p.set_conflict_handler(ResolveByPruning);
        p.add_option(OptionDescriptor::new(["-f", "--force"]).value_type(ValueType::Bool))
            .unwrap();
        let values = p.parse(["-f"]).unwrap();
        assert_eq!(values.get::<bool>("force"), Ok(Some(true)));
    }

    #[test]
    fn test_option_lookup_allows_abbreviation() {
        let mut p = parser();
        p.add_option(OptionDescriptor::new(["--output"])).unwrap();
        assert_eq!(p.option("--out").map(|h| h.dest()), Some("output"));
        assert!(!p.has_option("--out"));
        assert_eq!(p.existing_options(&["--output", "--nope"]), ["--output"]);
    }

    #[test]
    fn test_positional_count_enforced() {
        let mut p = parser();
        p.set_positional_args("copy SRC to DST", true, &["SRC", "DST"]);
        assert_eq!(p.usage_string(), "test [options] SRC DST\ncopy SRC to DST");
        assert!(p.parse(["a", "b"]).is_ok());
        assert!(matches!(
            p.parse(["a"]),
            Err(ParseError::PositionalCount {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_custom_converter_and_factory() {
        let mut p = parser();
        let ty = ValueType::Named("Pair".into());
        p.put_converter(ty.clone(), |raw| {
            let (a, b) = raw.split_once(':').ok_or("expected a:b")?;
            Ok(Value::Tuple(vec![a.into(), b.into()]))
        });
        p.add_option(OptionDescriptor::new(["--pair"]).value_type(ty))
            .unwrap();
        let values = p.parse(["--pair=x:y"]).unwrap();
        assert_eq!(values.get::<Vec<String>>("pair"), Ok(Some(vec!["x".into(), "y".into()])));

        let err = p.parse(["--pair", "xy"]).unwrap_err();
        assert_eq!(err.to_string(), "option --pair: invalid Pair value 'xy': expected a:b");

        assert!(p.remove_handler_factory("count").is_some());
        assert!(matches!(
            p.add_option(OptionDescriptor::new(["-v"]).action("count")),
            Err(SetupError::UnknownAction { .. })
        ));
    }

    #[test]
    fn test_remove_handler() {
        let mut p = parser();
        let id = p.add_option(OptionDescriptor::new(["-q"]).value_type(ValueType::Bool)).unwrap();
        assert!(p.remove(id).is_some());
        assert!(matches!(
            p.parse(["-q"]),
            Err(ParseError::UnknownOption { .. })
        ));
    }

    struct Settings {
        verbose: ValueCell,
        include: ValueCell,
    }

    impl DescribeOptions for Settings {
        fn describe_options(&self) -> Vec<OptionDescriptor> {
            vec![
                OptionDescriptor::named("verbose")
                    .action("count")
                    .slot(self.verbose.clone()),
                OptionDescriptor::named("I")
                    .action("append")
                    .shape(Shape::List)
                    .slot(self.include.clone()),
            ]
        }
    }

    #[test]
    fn test_parse_into_described_options() {
        let settings = Settings {
            verbose: ValueCell::new(),
            include: ValueCell::new(),
        };
        let rest = parse_into(&settings, ["--verbose", "-I", "a", "x", "-I", "b", "--verbose"]).unwrap();
        assert_eq!(rest, ["x"]);
        assert_eq!(settings.verbose.get_as::<i64>(), Some(2));
        assert_eq!(
            settings.include.get_as::<Vec<String>>(),
            Some(vec!["a".into(), "b".into()])
        );
    }

    #[test]
    fn test_callbacks_reach_scan_state() {
        let mut p = parser();
        let seen = ValueCell::new();
        let sink = seen.clone();
        p.add_option(OptionDescriptor::new(["--take"]).callback(Callback::full(
            move |name, _args, _ctx, state| {
                let taken = state.take_while_not_option();
                sink.set(Value::List(
                    std::iter::once(Value::from(name))
                        .chain(taken.into_iter().map(Value::from))
                        .collect(),
                ));
                Ok(())
            },
        )))
        .unwrap();
        p.add_option(OptionDescriptor::new(["-x"]).value_type(ValueType::Bool))
            .unwrap();
        let values = p.parse(["--ta", "a", "b", "-x", "c"]).unwrap();
        assert_eq!(
            seen.get_as::<Vec<String>>(),
            Some(vec!["--take".into(), "a".into(), "b".into()])
        );
        assert_eq!(values.positional(), ["c"]);
        assert_eq!(values.value("take"), Err(LookupError::NoValue("take".into())));
    }
}
