// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

/// Arguments shared by every subcommand: recipe, flags and platform
fn target_args(cmd: Command) -> Command {
    cmd.arg(
        Arg::new("recipe")
            .required(true)
            .help("Bundled recipe name or path to a recipe file"),
    )
    .arg(
        Arg::new("flags")
            .num_args(0..)
            .help("Build flags: with-X, without-X, X or X=value"),
    )
    .arg(
        Arg::new("set")
            .long("set")
            .value_name("ID=VALUE")
            .action(ArgAction::Append)
            .help("Set an option explicitly (repeatable)"),
    )
    .arg(Arg::new("os").long("os").help("Target OS family (linux, macos, freebsd, windows)"))
    .arg(
        Arg::new("os_version")
            .long("os-version")
            .value_name("VERSION")
            .help("Target OS release, e.g. 10.13"),
    )
    .arg(Arg::new("arch").long("arch").help("Target CPU architecture"))
    .arg(
        Arg::new("toolchain_version")
            .long("toolchain-version")
            .value_name("BUILD")
            .help("Compiler build number (Apple clang)"),
    )
}

fn build_cli() -> Command {
    Command::new("pantry")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Pantry Contributors")
        .about("Resolve, plan and cook declarative package build recipes")
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Settings file (default: ~/.config/pantry/config.toml)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print machine-readable JSON"),
        )
        .subcommand(target_args(
            Command::new("options").about("Show the options a recipe recognizes and their resolved values"),
        ))
        .subcommand(target_args(
            Command::new("deps").about("Show the effective dependency set"),
        ))
        .subcommand(target_args(
            Command::new("check").about("Validate a recipe and an option combination without building"),
        ))
        .subcommand(target_args(
            Command::new("plan").about("Compute the full build plan: arguments, environment and edits"),
        ))
        .subcommand(
            target_args(Command::new("cook").about("Fetch, configure, build and install a recipe"))
                .arg(
                    Arg::new("source_cache")
                        .long("source-cache")
                        .help("Directory for caching downloaded sources"),
                )
                .arg(
                    Arg::new("jobs")
                        .short('j')
                        .long("jobs")
                        .help("Number of parallel build jobs"),
                )
                .arg(
                    Arg::new("keep_builddir")
                        .long("keep-builddir")
                        .action(ArgAction::SetTrue)
                        .help("Keep the build directory after completion"),
                )
                .arg(
                    Arg::new("fetch_only")
                        .long("fetch-only")
                        .action(ArgAction::SetTrue)
                        .help("Only fetch sources, don't build"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("pantry.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
