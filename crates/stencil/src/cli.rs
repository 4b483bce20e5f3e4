//! Command-line flags and their translation into a [`Config`].
//!
//! Source flags may be repeated and mixed freely. Their relative order on
//! the command line is the load order, across flag kinds:
//!
//! ```text
//! stencil --var-file base.yaml --var env=prod --var-file override.yaml -f main.tpl
//!         └── 0 ──────────────┘ └── 1 ──────┘ └── 2 ───────────────────┘
//! ```

use std::path::PathBuf;

use clap::{ArgMatches, CommandFactory, FromArgMatches, Parser};
use stencil_render::{Config, TemplateSource, VarsSource};

/// Render templates from variables gathered out of files, environment and stdin.
#[derive(Debug, Parser)]
#[command(name = "stencil", version)]
pub struct Cli {
    /// Load a saved configuration before applying the other flags
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// A single variable
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_var)]
    pub vars: Vec<VarsSource>,

    /// Load variables from a JSON, YAML or TOML file (`-` reads stdin)
    #[arg(long = "var-file", value_name = "[KEY=]PATH", value_parser = parse_var_file)]
    pub var_files: Vec<VarsSource>,

    /// Set a variable to the raw content of a file (`-` reads stdin)
    #[arg(long = "var-file-slurp", value_name = "NAME=PATH", value_parser = parse_var_file_slurp)]
    pub var_file_slurps: Vec<VarsSource>,

    /// Set one variable per file matching a glob, keyed by path
    #[arg(
        long = "var-files-slurp",
        value_name = "[KEY=]GLOB",
        value_parser = parse_var_files_slurp
    )]
    pub var_files_slurps: Vec<VarsSource>,

    /// Load environment variables whose name starts with PREFIX
    #[arg(long = "var-env", value_name = "[KEY=]PREFIX", value_parser = parse_var_env)]
    pub var_envs: Vec<VarsSource>,

    /// A template given inline
    #[arg(
        short = 't',
        long = "template",
        value_name = "[NAME=]TEXT",
        value_parser = parse_template
    )]
    pub templates: Vec<TemplateArg>,

    /// A template file (`-` reads stdin); named by its path unless NAME is given
    #[arg(
        short = 'f',
        long = "template-file",
        value_name = "[NAME=]PATH",
        value_parser = parse_template_file
    )]
    pub template_files: Vec<TemplateSource>,

    /// One template per file matching a glob, named by path
    #[arg(long = "template-files", value_name = "GLOB")]
    pub template_globs: Vec<String>,

    /// Write the configuration to a file
    #[arg(long = "set-config-output-file", value_name = "PATH")]
    pub config_out: Option<PathBuf>,

    /// Write the resolved variables to a file
    #[arg(long = "set-vars-output-file", value_name = "PATH")]
    pub vars_out: Option<PathBuf>,

    /// Leave out templates whose name matches a glob
    #[arg(long = "set-template-excludes", value_name = "GLOB")]
    pub exclude: Option<String>,

    /// Write rendered templates to a directory (`-` prints them)
    #[arg(short = 'o', long = "set-output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Left variable delimiter
    #[arg(long = "set-left-delim", value_name = "TEXT")]
    pub left_delim: Option<String>,

    /// Right variable delimiter
    #[arg(long = "set-right-delim", value_name = "TEXT")]
    pub right_delim: Option<String>,

    /// Template rendered between printed templates
    #[arg(long = "set-separator", value_name = "TEXT")]
    pub separator: Option<String>,

    /// Print the configuration and exit
    #[arg(long)]
    pub print_config: bool,

    /// Print the resolved variables and exit
    #[arg(long)]
    pub print_vars: bool,

    /// Print the available functions and exit
    #[arg(long)]
    pub print_funcs: bool,

    /// Print rendered templates to stdout
    #[arg(long)]
    pub print_templates: bool,
}

/// An inline template; unnamed ones are numbered when added to the config.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateArg {
    pub name: Option<String>,
    pub text: String,
}

impl Cli {
    /// Parses arguments, keeping the matches for flag ordering.
    pub fn try_parse_with_matches<I, T>(args: I) -> Result<(Self, ArgMatches), clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<std::ffi::OsString> + Clone,
    {
        let matches = Self::command().try_get_matches_from(args)?;
        let cli = Self::from_arg_matches(&matches)?;
        Ok((cli, matches))
    }

    /// Applies the flags on top of `config`.
    ///
    /// Sources are appended in command-line order; scalar flags replace the
    /// configured values.
    pub fn apply(&self, matches: &ArgMatches, config: &mut Config) {
        let mut vars: Vec<(usize, VarsSource)> = Vec::new();
        vars.extend(ordered(matches, "vars", &self.vars));
        vars.extend(ordered(matches, "var_files", &self.var_files));
        vars.extend(ordered(matches, "var_file_slurps", &self.var_file_slurps));
        vars.extend(ordered(matches, "var_files_slurps", &self.var_files_slurps));
        vars.extend(ordered(matches, "var_envs", &self.var_envs));
        vars.sort_by_key(|(index, _)| *index);
        config
            .vars_sources
            .extend(vars.into_iter().map(|(_, source)| source));

        let mut templates: Vec<(usize, TemplateInput)> = Vec::new();
        templates.extend(
            ordered(matches, "templates", &self.templates)
                .map(|(i, t)| (i, TemplateInput::Inline(t))),
        );
        templates.extend(
            ordered(matches, "template_files", &self.template_files)
                .map(|(i, t)| (i, TemplateInput::Source(t))),
        );
        templates.extend(
            ordered(matches, "template_globs", &self.template_globs)
                .map(|(i, glob)| (i, TemplateInput::Source(TemplateSource::file_glob(glob)))),
        );
        templates.sort_by_key(|(index, _)| *index);
        for (_, input) in templates {
            let source = match input {
                TemplateInput::Source(source) => source,
                TemplateInput::Inline(arg) => {
                    let name = arg
                        .name
                        .unwrap_or_else(|| format!("__param_{}", config.template_sources.len()));
                    TemplateSource::literal(name, arg.text)
                }
            };
            config.template_sources.push(source);
        }

        if let Some(path) = &self.config_out {
            config.config_out_path = Some(path.clone());
        }
        if let Some(path) = &self.vars_out {
            config.vars_out_path = Some(path.clone());
        }
        if let Some(exclude) = &self.exclude {
            config.template_out_exclude = exclude.clone();
        }
        if let Some(dir) = &self.output_dir {
            config.template_out_path = Some(dir.clone());
        }
        if let Some(left) = &self.left_delim {
            config.template_left_delim = left.clone();
        }
        if let Some(right) = &self.right_delim {
            config.template_right_delim = right.clone();
        }
        if let Some(separator) = &self.separator {
            config.template_out_print_separator = separator.clone();
        }
        config.vars_out_print |= self.print_vars;
        config.template_out_print |= self.print_templates;
    }
}

enum TemplateInput {
    Inline(TemplateArg),
    Source(TemplateSource),
}

/// Pairs each value of a repeated flag with its command-line index.
fn ordered<'a, T: Clone>(
    matches: &'a ArgMatches,
    id: &str,
    values: &'a [T],
) -> impl Iterator<Item = (usize, T)> + 'a {
    matches
        .indices_of(id)
        .into_iter()
        .flatten()
        .zip(values.iter().cloned())
}

/// Splits `NAME=REST` at the first `=`; a leading `=` does not count.
fn split_named(value: &str) -> Option<(&str, &str)> {
    match value.find('=') {
        Some(i) if i > 0 => Some((&value[..i], &value[i + 1..])),
        _ => None,
    }
}

fn parse_var(value: &str) -> Result<VarsSource, String> {
    let (key, text) = split_named(value).ok_or("expected NAME=VALUE")?;
    Ok(VarsSource::literal(key, text))
}

fn parse_var_file(value: &str) -> Result<VarsSource, String> {
    let (key, path) = match split_named(value) {
        Some((key, path)) => (Some(key), path),
        None => (None, value),
    };
    let source = if path == "-" {
        VarsSource::stdin()
    } else {
        VarsSource::file(path)
    };
    Ok(match key {
        Some(key) => source.under(key),
        None => source,
    })
}

fn parse_var_file_slurp(value: &str) -> Result<VarsSource, String> {
    let (name, path) = split_named(value).ok_or("expected NAME=PATH")?;
    Ok(VarsSource::file_slurp(name, path))
}

fn parse_var_files_slurp(value: &str) -> Result<VarsSource, String> {
    Ok(match split_named(value) {
        Some((key, glob)) => VarsSource::files_slurp(glob).under(key),
        None => VarsSource::files_slurp(value),
    })
}

fn parse_var_env(value: &str) -> Result<VarsSource, String> {
    Ok(match value.split_once('=') {
        Some((key, prefix)) => VarsSource::env(prefix).under(key),
        None => VarsSource::env(value),
    })
}

fn parse_template(value: &str) -> Result<TemplateArg, String> {
    Ok(match split_named(value) {
        Some((name, text)) => TemplateArg {
            name: Some(name.to_string()),
            text: text.to_string(),
        },
        None => TemplateArg {
            name: None,
            text: value.to_string(),
        },
    })
}

fn parse_template_file(value: &str) -> Result<TemplateSource, String> {
    let (name, path) = split_named(value).unwrap_or((value, value));
    Ok(if path == "-" {
        TemplateSource::stdin(name)
    } else {
        TemplateSource::file(name, path)
    })
}
