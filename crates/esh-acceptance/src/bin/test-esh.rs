//! test-esh: a minimal interactive shell for exercising the scenarios.
//!
//! Reads one command per line and prints `esh> ` before each line when
//! standard input is a terminal. Supports `echo`, `cat` and `exit` as
//! builtins, `>` and `>>` redirection, external commands, and `&` to run an
//! external command in the background. With `-p <dir>` the plugin commands
//! `fortune`, `CtoF`, `pokedex` and `roll` are available as well.

use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitCode, Stdio};

use clap::Parser;
use rand::Rng;
use rand::seq::IndexedRandom;

const PROMPT: &str = "esh> ";

#[derive(Parser, Debug)]
#[command(name = "test-esh", about = "Minimal shell for acceptance tests")]
struct Args {
    /// Load plugins from this directory
    #[arg(short = 'p', value_name = "DIR")]
    plugin_dir: Option<PathBuf>,
}

const FORTUNES: &[&str] = &[
    "A journey of a thousand miles begins with a single step.",
    "You will find a bug where you least expect it.",
    "Patience is a virtue that compiles slowly.",
    "The early process gets the terminal.",
    "Every pipe has two ends, and both deserve attention.",
    "Today is a good day to reap your children.",
];

const POKEDEX: [&str; 151] = [
    "bulbasaur", "ivysaur", "venusaur", "charmander", "charmeleon", "charizard", "squirtle", "wartortle",
    "blastoise", "caterpie", "metapod", "butterfree", "weedle", "kakuna", "beedrill", "pidgey", "pidgeotto",
    "pidgeot", "rattata", "raticate", "spearow", "fearow", "ekans", "arbok", "pikachu", "raichu", "sandshrew",
    "sandslash", "nidoran-f", "nidorina", "nidoqueen", "nidoran-m", "nidorino", "nidoking", "clefairy",
    "clefable", "vulpix", "ninetales", "jigglypuff", "wigglytuff", "zubat", "golbat", "oddish", "gloom",
    "vileplume", "paras", "parasect", "venonat", "venomoth", "diglett", "dugtrio", "meowth", "persian",
    "psyduck", "golduck", "mankey", "primeape", "growlithe", "arcanine", "poliwag", "poliwhirl", "poliwrath",
    "abra", "kadabra", "alakazam", "machop", "machoke", "machamp", "bellsprout", "weepinbell", "victreebel",
    "tentacool", "tentacruel", "geodude", "graveler", "golem", "ponyta", "rapidash", "slowpoke", "slowbro",
    "magnemite", "magneton", "farfetchd", "doduo", "dodrio", "seel", "dewgong", "grimer", "muk", "shellder",
    "cloyster", "gastly", "haunter", "gengar", "onix", "drowzee", "hypno", "krabby", "kingler", "voltorb",
    "electrode", "exeggcute", "exeggutor", "cubone", "marowak", "hitmonlee", "hitmonchan", "lickitung",
    "koffing", "weezing", "rhyhorn", "rhydon", "chansey", "tangela", "kangaskhan", "horsea", "seadra",
    "goldeen", "seaking", "staryu", "starmie", "mr-mime", "scyther", "jynx", "electabuzz", "magmar", "pinsir",
    "tauros", "magikarp", "gyarados", "lapras", "ditto", "eevee", "vaporeon", "jolteon", "flareon", "porygon",
    "omanyte", "omastar", "kabuto", "kabutops", "aerodactyl", "snorlax", "articuno", "zapdos", "moltres",
    "dratini", "dragonair", "dragonite", "mewtwo", "mew",
];

/// Where a command's standard output goes.
enum Output {
    Stdout,
    File(File),
}

impl Output {
    fn writer(&mut self) -> Box<dyn Write + '_> {
        match self {
            Self::Stdout => Box::new(io::stdout().lock()),
            Self::File(file) => Box::new(file),
        }
    }

    fn stdio(&self) -> io::Result<Stdio> {
        match self {
            Self::Stdout => Ok(Stdio::inherit()),
            Self::File(file) => Ok(Stdio::from(file.try_clone()?)),
        }
    }
}

/// One parsed command line.
struct Line<'a> {
    words: Vec<&'a str>,
    redirect: Option<(&'a str, bool)>,
    background: bool,
}

fn parse(line: &str) -> Result<Line<'_>, String> {
    let mut words = Vec::new();
    let mut redirect = None;
    let mut background = false;
    let mut tokens = line.split_whitespace().peekable();

    while let Some(token) = tokens.next() {
        match token {
            ">" | ">>" => {
                let target = tokens.next().ok_or_else(|| format!("syntax error near `{token}`"))?;
                redirect = Some((target, token == ">>"));
            }
            "&" if tokens.peek().is_none() => background = true,
            _ => words.push(token),
        }
    }

    Ok(Line {
        words,
        redirect,
        background,
    })
}

struct Shell {
    plugins: bool,
    jobs: Vec<Child>,
    next_job: usize,
}

enum Flow {
    Continue,
    Exit,
}

impl Shell {
    fn execute(&mut self, line: &str) -> Flow {
        self.reap_jobs();

        let line = match parse(line) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("esh: {e}");
                return Flow::Continue;
            }
        };
        let Some((&command, args)) = line.words.split_first() else {
            return Flow::Continue;
        };
        if command == "exit" {
            return Flow::Exit;
        }

        let mut output = match line.redirect {
            None => Output::Stdout,
            Some((path, append)) => match open_redirect(path, append) {
                Ok(file) => Output::File(file),
                Err(e) => {
                    eprintln!("esh: {path}: {e}");
                    return Flow::Continue;
                }
            },
        };

        let result = match command {
            "echo" => writeln!(output.writer(), "{}", args.join(" ")),
            "cat" => cat(args, &mut output),
            "fortune" if self.plugins => fortune(&mut output),
            "CtoF" if self.plugins => ctof(args, &mut output),
            "pokedex" if self.plugins => pokedex(args, &mut output),
            "roll" if self.plugins => roll(args, &mut output),
            _ => self.external(command, args, &output, line.background),
        };
        if let Err(e) = result {
            eprintln!("esh: {command}: {e}");
        }

        Flow::Continue
    }

    fn external(&mut self, command: &str, args: &[&str], output: &Output, background: bool) -> io::Result<()> {
        let child = Command::new(command).args(args).stdout(output.stdio()?).spawn();
        let mut child = match child {
            Ok(child) => child,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                eprintln!("esh: {command}: command not found");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        if background {
            self.next_job += 1;
            println!("[{}] {}", self.next_job, child.id());
            self.jobs.push(child);
        } else {
            child.wait()?;
        }
        Ok(())
    }

    fn reap_jobs(&mut self) {
        self.jobs.retain_mut(|job| matches!(job.try_wait(), Ok(None)));
    }
}

fn open_redirect(path: &str, append: bool) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .append(append)
        .truncate(!append)
        .open(path)
}

fn cat(files: &[&str], output: &mut Output) -> io::Result<()> {
    let mut out = output.writer();
    for file in files {
        match std::fs::read(file) {
            Ok(data) => out.write_all(&data)?,
            Err(e) => eprintln!("cat: {file}: {e}"),
        }
    }
    out.flush()
}

fn fortune(output: &mut Output) -> io::Result<()> {
    let fortune = FORTUNES.choose(&mut rand::rng()).copied().unwrap_or(FORTUNES[0]);
    writeln!(output.writer(), "{fortune}")
}

fn ctof(args: &[&str], output: &mut Output) -> io::Result<()> {
    match args.first().and_then(|s| s.parse::<f64>().ok()) {
        Some(celsius) => writeln!(output.writer(), "{:.6} F", celsius * 9.0 / 5.0 + 32.0),
        None => writeln!(output.writer(), "usage: CtoF <celsius>"),
    }
}

fn pokedex(args: &[&str], output: &mut Output) -> io::Result<()> {
    let name = args
        .first()
        .and_then(|s| s.parse::<usize>().ok())
        .and_then(|n| n.checked_sub(1))
        .and_then(|i| POKEDEX.get(i))
        .copied()
        .unwrap_or("missingno");
    writeln!(output.writer(), "{name}")
}

fn roll(args: &[&str], output: &mut Output) -> io::Result<()> {
    let mut out = output.writer();
    match args.first().and_then(|s| s.parse::<u32>().ok()).filter(|&n| n >= 1) {
        Some(sides) => {
            writeln!(out, "Rolling a {sides}-sided die...")?;
            writeln!(out, "{}", rand::rng().random_range(1..=sides))
        }
        None => writeln!(out, "Please enter a valid number."),
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    let interactive = io::stdin().is_terminal();
    let mut shell = Shell {
        plugins: args.plugin_dir.is_some(),
        jobs: Vec::new(),
        next_job: 0,
    };

    let mut input = io::stdin().lock();
    let mut line = String::new();
    loop {
        if interactive {
            print!("{PROMPT}");
            if io::stdout().flush().is_err() {
                return ExitCode::FAILURE;
            }
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("esh: {e}");
                return ExitCode::FAILURE;
            }
        }

        if let Flow::Exit = shell.execute(&line) {
            break;
        }
    }

    ExitCode::SUCCESS
}
