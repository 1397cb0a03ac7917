use std::{collections::HashMap, ffi::OsString};

use clap::{Arg, ArgAction, Command};

use super::{option_key, Category, OptionDef, OptionKind, Options, OPTION_DEFS};
use crate::error::Result;

/// Builds the command line interface and parses it into `Options`.
#[derive(Debug, Clone)]
pub struct OptionsParser {
    name: String,
    splits: HashMap<Category, Vec<String>>,
    extra: Vec<Arg>,
}

impl OptionsParser {
    /// Creates a new `OptionsParser` with the built-in options and no splits.
    pub fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            splits: HashMap::new(),
            extra: Vec::new(),
        }
    }

    /// Sets the program name shown in the usage message.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Splits `category` into the given subsets.
    ///
    /// Every flag of the category is then registered once per subset, prefixed with the subset's name, and the
    /// unprefixed flags are no longer available.
    pub fn split<I, S>(mut self, category: Category, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = names.into_iter().map(Into::into).collect();
        self.splits.insert(category, names);
        self
    }

    /// Registers an application specific argument next to the built-in ones.
    pub fn arg(mut self, arg: Arg) -> Self {
        self.extra.push(arg);
        self
    }

    /// Builds the clap `Command` with every registered flag.
    pub fn command(&self) -> Command {
        let mut command = Command::new(self.name.clone());

        for def in OPTION_DEFS {
            match self.splits.get(&def.category) {
                Some(names) => {
                    for name in names {
                        command = command.arg(build_arg(def, Some(name)));
                    }
                }
                None => command = command.arg(build_arg(def, None)),
            }
        }

        for arg in &self.extra {
            command = command.arg(arg.clone());
        }

        command
    }

    /// Parses `args`, where the first item is the program name.
    ///
    /// # Errors
    /// Returns a `ConfigErr::Cli` if an argument is unknown or has an invalid value.
    pub fn try_parse_from<I, T>(&self, args: I) -> Result<Options>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let matches = self.command().try_get_matches_from(args)?;
        Ok(Options::new(matches, self.splits.clone()))
    }
}

impl Default for OptionsParser {
    fn default() -> Self {
        Self::new()
    }
}

fn build_arg(def: &OptionDef, prefix: Option<&str>) -> Arg {
    let key = option_key(prefix, def.name);
    let help = match prefix {
        Some(prefix) => format!("{} ({prefix})", def.help),
        None => def.help.to_string(),
    };

    let arg = Arg::new(key.clone())
        .long(key)
        .help(help)
        .help_heading(def.category.as_str());

    let arg = match def.kind {
        OptionKind::Text => arg.action(ArgAction::Set),
        OptionKind::Float => arg.action(ArgAction::Set).value_parser(parse_finite),
        OptionKind::PositiveInt => arg.action(ArgAction::Set).value_parser(parse_positive),
        OptionKind::Int => arg
            .action(ArgAction::Set)
            .value_parser(clap::value_parser!(usize)),
        OptionKind::Flag => arg.action(ArgAction::SetTrue),
    };

    match def.default {
        Some(default) => arg.default_value(default),
        None => arg,
    }
}

fn parse_finite(s: &str) -> std::result::Result<f32, String> {
    let value: f32 = s.parse().map_err(|e| format!("{e}"))?;
    if !value.is_finite() {
        return Err(format!("{s} is not a finite number"));
    }
    Ok(value)
}

fn parse_positive(s: &str) -> std::result::Result<usize, String> {
    let value: usize = s.parse().map_err(|e| format!("{e}"))?;
    if value == 0 {
        return Err("must be greater than 0".to_string());
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ConfigErr, options::Subset};

    #[test]
    fn defaults_are_applied() {
        let opts = OptionsParser::new().try_parse_from(["prog"]).unwrap();

        let optim = opts.optimizer(&Subset::None).unwrap();
        assert_eq!(optim.optimizer, "adam");
        assert_eq!(optim.lr, 1e-3);
        assert_eq!(optim.beta2, 0.999);
        assert!(!optim.centered);

        let sched = opts.scheduler(&Subset::None).unwrap();
        assert_eq!(sched.lr_schedule, "step");
        assert_eq!(sched.lr_step_size, 100);

        let general = opts.general(&Subset::None).unwrap();
        assert_eq!(general.experiment_name, "experiment");
    }

    #[test]
    fn flags_override_defaults() {
        let opts = OptionsParser::new()
            .try_parse_from([
                "prog",
                "--optimizer",
                "rmsprop",
                "--lr",
                "0.05",
                "--centered",
                "--lr_patience",
                "3",
            ])
            .unwrap();

        let optim = opts.optimizer(&Subset::None).unwrap();
        assert_eq!(optim.optimizer, "rmsprop");
        assert_eq!(optim.lr, 0.05);
        assert!(optim.centered);
        assert_eq!(opts.scheduler(&Subset::None).unwrap().lr_patience, 3);
    }

    #[test]
    fn split_category_gets_prefixed_flags() {
        let parser = OptionsParser::new().split(Category::Optimizer, ["gen", "disc"]);
        let opts = parser
            .try_parse_from(["prog", "--gen_lr", "0.1", "--disc_optimizer", "sgd"])
            .unwrap();

        let generator = opts.optimizer(&Subset::name("gen")).unwrap();
        let disc = opts.optimizer(&Subset::name("disc")).unwrap();
        assert_eq!(generator.lr, 0.1);
        assert_eq!(generator.optimizer, "adam");
        assert_eq!(disc.lr, 1e-3);
        assert_eq!(disc.optimizer, "sgd");

        // unsplit categories keep the plain flags
        assert!(opts.scheduler(&Subset::name("gen")).is_ok());
    }

    #[test]
    fn split_category_rejects_plain_flags() {
        let parser = OptionsParser::new().split(Category::Optimizer, ["gen"]);
        assert!(matches!(
            parser.try_parse_from(["prog", "--lr", "0.1"]),
            Err(ConfigErr::Cli(_))
        ));
    }

    #[test]
    fn split_category_requires_a_registered_subset() {
        let opts = OptionsParser::new()
            .split(Category::Optimizer, ["gen"])
            .try_parse_from(["prog"])
            .unwrap();

        assert!(matches!(
            opts.optimizer(&Subset::None),
            Err(ConfigErr::SubsetRequired("optimizer"))
        ));
        assert!(matches!(
            opts.optimizer(&Subset::name("critic")),
            Err(ConfigErr::UnknownSubset { .. })
        ));
    }

    #[test]
    fn non_finite_floats_are_rejected() {
        let parser = OptionsParser::new();
        assert!(parser.try_parse_from(["prog", "--lr", "inf"]).is_err());
        assert!(parser.try_parse_from(["prog", "--lr", "NaN"]).is_err());
    }

    #[test]
    fn zero_step_size_is_rejected() {
        let parser = OptionsParser::new();
        assert!(parser.try_parse_from(["prog", "--lr_step_size", "0"]).is_err());
    }

    #[test]
    fn extra_arguments_are_parsed() {
        let parser = OptionsParser::new().arg(
            Arg::new("epochs")
                .long("epochs")
                .value_parser(clap::value_parser!(usize))
                .default_value("5"),
        );
        let opts = parser.try_parse_from(["prog", "--epochs", "7"]).unwrap();
        assert_eq!(opts.matches().get_one::<usize>("epochs"), Some(&7));
    }
}
