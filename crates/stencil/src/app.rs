//! The run pipeline behind the `stencil` binary.
//!
//! ```text
//! config ──► [write config] ──► [print config]
//!        ──► functions ──► [print funcs]
//!        ──► vars ──► [write vars] ──► [print vars]
//!        ──► templates ──► directory | stdout
//! ```
//!
//! Bracketed steps are optional; the `print` steps end the run.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::ArgMatches;
use stencil_render::{Config, FunctionRegistry, Host, Value};
use tracing::{debug, info};

use crate::cli::Cli;

/// Directory value that means "print to stdout".
const PRINT_DIR: &str = "-";

/// Runs one invocation with the real process environment.
pub fn run(cli: &Cli, matches: &ArgMatches, args: Vec<String>) -> Result<()> {
    let mut stdout = io::stdout().lock();
    run_with(cli, matches, args, &Host::real(), &mut stdout)
}

/// Runs one invocation against `host`, writing printed output to `out`.
pub fn run_with<W: Write>(
    cli: &Cli,
    matches: &ArgMatches,
    args: Vec<String>,
    host: &Host,
    out: &mut W,
) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => Config::default(),
    };
    cli.apply(matches, &mut config);

    if let Some(path) = &config.config_out_path {
        write_file(path, |w| config.save(w).map_err(Into::into))
            .with_context(|| format!("writing config {}", path.display()))?;
        info!(path = %path.display(), "wrote config");
    }
    if cli.print_config {
        config.save(&mut *out)?;
        return Ok(());
    }

    config.ensure_template_source();
    if config
        .template_out_path
        .as_deref()
        .is_some_and(|dir| dir == Path::new(PRINT_DIR))
    {
        config.template_out_path = None;
        config.template_out_print = true;
    }

    let functions = registry(&config, args);
    if cli.print_funcs {
        print_funcs(&functions, out)?;
        return Ok(());
    }

    let vars = config.build_vars(host).context("loading variables")?;
    debug!(count = vars.len(), "resolved variables");
    if let Some(path) = &config.vars_out_path {
        write_file(path, |w| vars.save(w).map_err(Into::into))
            .with_context(|| format!("writing variables {}", path.display()))?;
        info!(path = %path.display(), "wrote variables");
    }
    if config.vars_out_print {
        vars.save(&mut *out)?;
        return Ok(());
    }

    let templates = config
        .build_templates(Arc::new(functions), &vars, host)
        .context("loading templates")?;
    debug!(count = templates.len(), "compiled templates");

    let mut print = config.template_out_print;
    match &config.template_out_path {
        Some(dir) => {
            let written = templates
                .render_to_dir(&config.template_out_exclude, dir)
                .with_context(|| format!("rendering into {}", dir.display()))?;
            for path in &written {
                info!(path = %path.display(), "rendered");
            }
        }
        None => print = true,
    }
    if print {
        templates.render(
            &config.template_out_exclude,
            &config.template_out_print_separator,
            &mut *out,
        )?;
        out.flush()?;
    }
    Ok(())
}

/// The standard registry plus `__RENDER_ARGS` and `__RENDER_CONFIG`.
fn registry(config: &Config, args: Vec<String>) -> FunctionRegistry {
    let config = Value::from_serialize(config);
    let args = Value::from(args);
    FunctionRegistry::standard()
        .with_function("__RENDER_ARGS", move |_| Ok(args.clone()))
        .with_function("__RENDER_CONFIG", move |_| Ok(config.clone()))
}

fn print_funcs<W: Write>(functions: &FunctionRegistry, out: &mut W) -> io::Result<()> {
    let width = functions.names().map(str::len).max().unwrap_or(0);
    for (name, function) in functions.iter() {
        writeln!(out, "{name:<width$} {}", function.origin())?;
    }
    Ok(())
}

fn write_file<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<()>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    write(&mut writer)?;
    writer.flush()?;
    Ok(())
}
