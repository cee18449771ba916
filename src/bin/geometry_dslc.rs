//! Command-line front-end for `geometry_dsl`: compiles a `.sdf` source file
//! (or stdin) to GLSL, or evaluates it at a point, without standing up the
//! out-of-scope HTTP service (`spec.md` §9 Non-goals).

extern crate clap;

use clap::{App, Arg, ArgMatches, SubCommand};
use std::fs::File;
use std::io::{self, Read};
use std::process;

use geometry_dsl::{compile_to_glsl, eval_at};

fn read_source(matches: &ArgMatches) -> io::Result<String> {
    if let Some(path) = matches.value_of("INPUT") {
        let mut file = File::open(path)?;
        let mut src = String::new();
        file.read_to_string(&mut src)?;
        Ok(src)
    } else {
        let mut src = String::new();
        io::stdin().read_to_string(&mut src)?;
        Ok(src)
    }
}

fn input_arg() -> Arg<'static, 'static> {
    Arg::with_name("INPUT")
        .short('i')
        .long("input")
        .help("Reads the program from FILE instead of stdin")
        .value_name("FILE")
        .takes_value(true)
}

fn main() {
    env_logger::init();

    let matches = App::new("geometry_dslc")
        .version("0.1")
        .about("Compiles the geometry DSL to GLSL, or evaluates it at a point")
        .subcommand(
            SubCommand::with_name("glsl")
                .about("Prints the compiled GLSL sdf() function")
                .arg(input_arg()),
        )
        .subcommand(
            SubCommand::with_name("eval")
                .about("Evaluates the program at a point and prints the distance")
                .arg(input_arg())
                .arg(
                    Arg::with_name("POINT")
                        .help("The point to evaluate at, as \"x,y,z\"")
                        .value_name("X,Y,Z")
                        .required(true),
                ),
        )
        .get_matches();

    let result = if let Some(cmd) = matches.subcommand_matches("glsl") {
        run_glsl(cmd)
    } else if let Some(cmd) = matches.subcommand_matches("eval") {
        run_eval(cmd)
    } else {
        eprintln!("usage: geometry_dslc <glsl|eval> [--input FILE] ...");
        process::exit(1);
    };

    if let Err(err) = result {
        log::error!("{err}");
        eprintln!("error: {err}");
        process::exit(1);
    }
}

fn run_glsl(matches: &ArgMatches) -> Result<(), String> {
    let src = read_source(matches).map_err(|e| e.to_string())?;
    let glsl = compile_to_glsl(&src).map_err(|e| e.to_string())?;
    print!("{glsl}");
    Ok(())
}

fn run_eval(matches: &ArgMatches) -> Result<(), String> {
    let src = read_source(matches).map_err(|e| e.to_string())?;
    let point = parse_point(matches.value_of("POINT").unwrap())?;
    let d = eval_at(&src, point).map_err(|e| e.to_string())?;
    println!("{d}");
    Ok(())
}

fn parse_point(s: &str) -> Result<(f32, f32, f32), String> {
    let parts: Vec<&str> = s.split(',').collect();
    if parts.len() != 3 {
        return Err(format!("expected \"x,y,z\", got {s:?}"));
    }
    let parse = |s: &str| s.trim().parse::<f32>().map_err(|e| e.to_string());
    Ok((parse(parts[0])?, parse(parts[1])?, parse(parts[2])?))
}
