use std::{
    ffi::OsString,
    io::{BufRead, BufReader, Read, Write},
    process::{Command as ProcessCommand, Stdio},
    sync::{
        mpsc::{self, Sender},
        Arc,
    },
    thread,
};

use crate::{
    form::{CallbackError, RunCallback},
    spec::{ActionKind, ArgSpec},
    types::{Namespace, Value},
};

const STDERR_PREFIX: &str = "[stderr] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputStream {
    Stdout,
    Stderr,
}

#[derive(Debug)]
enum OutputEvent {
    Line { stream: OutputStream, line: String },
    ReadError { stream: OutputStream, message: String },
}

/// Runs an external program with arguments rebuilt from a namespace.
///
/// Options come first in spec order, then positionals. Standard output and
/// standard error are streamed line by line into the run writer.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: OsString,
    base_args: Vec<String>,
    specs: Vec<Arc<ArgSpec>>,
}

impl ProcessRunner {
    /// Creates a runner for `program` driven by `specs`.
    pub fn new(program: impl Into<OsString>, specs: Vec<Arc<ArgSpec>>) -> Self {
        Self {
            program: program.into(),
            base_args: Vec::new(),
            specs,
        }
    }

    /// Arguments placed before the generated ones.
    pub fn with_base_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.base_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Program to execute.
    pub fn program(&self) -> &OsString {
        &self.program
    }

    /// Full argument vector for `namespace`, excluding the program.
    pub fn build_args(&self, namespace: &Namespace) -> Vec<String> {
        let mut args = self.base_args.clone();
        let mut positionals = Vec::new();
        for spec in &self.specs {
            let Some(value) = namespace.get(spec.dest()) else {
                continue;
            };
            match (spec.action(), preferred_flag(spec)) {
                (ActionKind::Store, None) => positionals.extend(value.to_args()),
                (ActionKind::Store, Some(flag)) => append_option(&mut args, flag, value),
                (ActionKind::StoreTrue, Some(flag)) => {
                    if value.as_bool() == Some(true) {
                        args.push(flag.to_owned());
                    }
                }
                _ => {}
            }
        }
        args.extend(positionals);
        args
    }

    /// Spawns the program and streams its output into `out`.
    ///
    /// A non-zero exit status is reported as an error after the output is
    /// fully drained.
    pub fn run(
        &self,
        namespace: &Namespace,
        out: &mut dyn Write,
    ) -> std::result::Result<(), CallbackError> {
        let args = self.build_args(namespace);
        let program = self.program.to_string_lossy().into_owned();
        writeln!(out, "$ {}", format_invocation(&program, &args))?;
        tracing::info!(program = %program, args = args.len(), "spawning program");

        let mut child = ProcessCommand::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|error| format!("failed to start `{program}`: {error}"))?;

        let (sender, receiver) = mpsc::channel();
        if let Some(stdout) = child.stdout.take() {
            spawn_output_reader(stdout, OutputStream::Stdout, sender.clone());
        }
        if let Some(stderr) = child.stderr.take() {
            spawn_output_reader(stderr, OutputStream::Stderr, sender.clone());
        }
        drop(sender);

        for event in receiver {
            match event {
                OutputEvent::Line {
                    stream: OutputStream::Stdout,
                    line,
                } => writeln!(out, "{line}")?,
                OutputEvent::Line {
                    stream: OutputStream::Stderr,
                    line,
                } => writeln!(out, "{STDERR_PREFIX}{line}")?,
                OutputEvent::ReadError { stream, message } => {
                    tracing::warn!(?stream, %message, "output stream read failed");
                    writeln!(out, "{STDERR_PREFIX}read error on {stream:?}: {message}")?;
                }
            }
        }

        let status = child.wait()?;
        match status.code() {
            Some(code) => writeln!(out, "exit: {code}")?,
            None => writeln!(out, "exit: terminated by signal")?,
        }
        tracing::info!(program = %program, success = status.success(), "program finished");
        if status.success() {
            Ok(())
        } else {
            Err(format!("`{program}` exited with {status}").into())
        }
    }

    /// Wraps the runner as a form callback.
    pub fn into_callback(self) -> RunCallback {
        Box::new(move |namespace: &Namespace, out: &mut dyn Write| {
            self.run(namespace, out)
        })
    }
}

fn preferred_flag(spec: &ArgSpec) -> Option<&str> {
    spec.flags()
        .iter()
        .find(|flag| flag.starts_with("--"))
        .or_else(|| spec.flags().first())
        .map(String::as_str)
}

fn append_option(args: &mut Vec<String>, flag: &str, value: &Value) {
    for text in value.to_args() {
        // Hyphen-led values would be read back as flags.
        if text.starts_with('-') && flag.starts_with("--") {
            args.push(format!("{flag}={text}"));
        } else {
            args.push(flag.to_owned());
            args.push(text);
        }
    }
}

fn spawn_output_reader(
    stream: impl Read + Send + 'static,
    stream_kind: OutputStream,
    sender: Sender<OutputEvent>,
) {
    thread::spawn(move || {
        let mut reader = BufReader::new(stream);
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            match reader.read_until(b'\n', &mut buffer) {
                Ok(0) => break,
                Ok(_) => {
                    trim_line_ending(&mut buffer);
                    let line = String::from_utf8_lossy(&buffer).into_owned();
                    if sender
                        .send(OutputEvent::Line {
                            stream: stream_kind,
                            line,
                        })
                        .is_err()
                    {
                        break;
                    }
                }
                Err(error) => {
                    let _ = sender.send(OutputEvent::ReadError {
                        stream: stream_kind,
                        message: error.to_string(),
                    });
                    break;
                }
            }
        }
    });
}

fn trim_line_ending(buffer: &mut Vec<u8>) {
    while buffer
        .last()
        .is_some_and(|byte| *byte == b'\n' || *byte == b'\r')
    {
        buffer.pop();
    }
}

fn format_invocation(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .map(|arg| {
            shlex::try_quote(arg)
                .map(|quoted| quoted.into_owned())
                .unwrap_or_else(|_| format!("{arg:?}"))
        })
        .collect::<Vec<_>>()
        .join(" ")
}
