use std::io::Write;

use clap::{CommandFactory, Parser};

use crate::{
    form::{CallbackError, RunCallback},
    types::Namespace,
};

/// Built-in command shown by `cligui demo`.
///
/// Only the derived `clap::Command` is used; values arrive through the form.
#[allow(dead_code)]
#[derive(Debug, Parser)]
#[command(name = "greet", version, about = "Print a greeting a few times.")]
pub(crate) struct GreetArgs {
    /// Who to greet.
    name: String,
    /// Greeting word.
    #[arg(long, short, default_value = "hello")]
    greeting: String,
    /// How many lines to print.
    #[arg(long, short, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=20))]
    times: u8,
    /// Print in upper case.
    #[arg(long)]
    shout: bool,
}

pub(crate) fn command() -> clap::Command {
    GreetArgs::command()
}

pub(crate) fn callback() -> RunCallback {
    Box::new(|namespace: &Namespace, out: &mut dyn Write| greet(namespace, out))
}

fn greet(namespace: &Namespace, out: &mut dyn Write) -> Result<(), CallbackError> {
    let name = namespace
        .get_str("name")
        .ok_or("`name` is required")?;
    let greeting = namespace.get_str("greeting").unwrap_or("hello");
    let times = namespace.get_int("times").unwrap_or(1);
    let mut line = format!("{greeting}, {name}!");
    if namespace.get_bool("shout") == Some(true) {
        line = line.to_uppercase();
    }
    for _ in 0..times {
        writeln!(out, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod unit_tests {
    use crate::{
        form::CliForm,
        schema::specs_from_command,
        types::{Namespace, Value},
    };

    use super::{callback, command, greet};

    #[test]
    fn greet_repeats_and_shouts() {
        let mut namespace = Namespace::new();
        namespace.set("name", Some(Value::Str("ada".to_owned())));
        namespace.set("greeting", Some(Value::Str("hi".to_owned())));
        namespace.set("times", Some(Value::Int(2)));
        namespace.set("shout", Some(Value::Bool(true)));
        let mut out = Vec::new();
        greet(&namespace, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "HI, ADA!\nHI, ADA!\n");
    }

    #[test]
    fn missing_name_fails_the_run() {
        let mut out = Vec::new();
        let error = greet(&Namespace::new(), &mut out).unwrap_err();
        assert!(error.to_string().contains("`name` is required"));
    }

    #[test]
    fn demo_command_builds_a_form() {
        let specs = specs_from_command(&command()).unwrap();
        let form = CliForm::build(specs, Some(callback())).unwrap();
        let dests = form
            .content()
            .widgets()
            .iter()
            .map(|widget| widget.spec().dest().to_owned())
            .collect::<Vec<_>>();
        assert!(dests.starts_with(&[
            "name".to_owned(),
            "greeting".to_owned(),
            "times".to_owned(),
            "shout".to_owned()
        ]));
        assert!(dests.contains(&"help".to_owned()));
        assert!(dests.contains(&"version".to_owned()));
    }
}
