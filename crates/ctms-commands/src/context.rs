//! Command execution context

use colored::Colorize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct CommandContext {
	pub args: Vec<String>,
	pub options: HashMap<String, Vec<String>>,
	pub verbosity: u8,
}

impl CommandContext {
	pub fn new(args: Vec<String>) -> Self {
		Self {
			args,
			options: HashMap::new(),
			verbosity: 0,
		}
	}

	pub fn with_options(mut self, options: HashMap<String, Vec<String>>) -> Self {
		self.options = options;
		self
	}

	pub fn arg(&self, index: usize) -> Option<&String> {
		self.args.get(index)
	}

	pub fn option(&self, key: &str) -> Option<&String> {
		self.options.get(key).and_then(|v| v.first())
	}

	pub fn has_option(&self, key: &str) -> bool {
		self.options.contains_key(key)
	}

	/// Settings file passed with `--settings`, if any
	pub fn settings_file(&self) -> Option<&Path> {
		self.option("settings").map(Path::new)
	}

	pub fn info(&self, message: &str) {
		println!("{} {}", "[INFO]".cyan(), message);
	}

	pub fn success(&self, message: &str) {
		println!("{} {}", "[SUCCESS]".green().bold(), message);
	}

	pub fn warning(&self, message: &str) {
		eprintln!("{} {}", "[WARNING]".yellow(), message);
	}

	/// Printed only with `-v` or more
	pub fn verbose(&self, message: &str) {
		if self.verbosity > 0 {
			println!("{} {}", "[VERBOSE]".dimmed(), message);
		}
	}

	pub fn set_option(&mut self, key: String, value: String) {
		self.options.insert(key, vec![value]);
	}

	/// Add an argument to the context
	pub fn add_arg(&mut self, arg: String) {
		self.args.push(arg);
	}

	/// Set the verbosity level
	pub fn set_verbosity(&mut self, level: u8) {
		self.verbosity = level;
	}

	/// Get the verbosity level
	pub fn verbosity(&self) -> u8 {
		self.verbosity
	}
}

impl Default for CommandContext {
	fn default() -> Self {
		Self::new(Vec::new())
	}
}
