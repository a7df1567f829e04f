use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{MarkovError, Result};

/// Suffix inserted before the extension of a backoff level's file name.
pub(crate) const SUB_CHAIN_SUFFIX: &str = "_sub";

/// On-disk encoding of a chain document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
	/// Compact `postcard` encoding, used for `.bin` files.
	Binary,
	/// Human readable JSON, used for every other extension.
	Json,
}

impl Format {
	/// Picks the format from the file extension.
	pub(crate) fn from_path<P: AsRef<Path>>(path: P) -> Self {
		match path.as_ref().extension() {
			Some(ext) if ext == "bin" => Format::Binary,
			_ => Format::Json,
		}
	}
}

/// Encodes `document` and writes it to `path`.
///
/// The file handle is scoped to this call and closed on every exit path.
pub(crate) fn write_document<T, P>(path: P, document: &T) -> Result<()>
where
	T: Serialize,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	let io_error = |source| MarkovError::Io { path: path.to_path_buf(), source };

	let file = File::create(path).map_err(io_error)?;
	let mut writer = BufWriter::new(file);
	match Format::from_path(path) {
		Format::Binary => {
			let bytes = postcard::to_stdvec(document)
				.map_err(|e| MarkovError::malformed(path, e.to_string()))?;
			writer.write_all(&bytes).map_err(io_error)?;
		}
		Format::Json => {
			serde_json::to_writer_pretty(&mut writer, document)
				.map_err(|e| MarkovError::malformed(path, e.to_string()))?;
			writer.write_all(b"\n").map_err(io_error)?;
		}
	}
	writer.flush().map_err(io_error)
}

/// Reads and decodes the document stored at `path`.
///
/// A missing file is reported as `Io`, anything that does not decode
/// into `T` as `Malformed`.
pub(crate) fn read_document<T, P>(path: P) -> Result<T>
where
	T: DeserializeOwned,
	P: AsRef<Path>,
{
	let path = path.as_ref();
	let io_error = |source| MarkovError::Io { path: path.to_path_buf(), source };

	let file = File::open(path).map_err(io_error)?;
	let mut reader = BufReader::new(file);
	match Format::from_path(path) {
		Format::Binary => {
			let mut bytes = Vec::new();
			reader.read_to_end(&mut bytes).map_err(io_error)?;
			postcard::from_bytes(&bytes).map_err(|e| MarkovError::malformed(path, e.to_string()))
		}
		Format::Json => {
			serde_json::from_reader(reader).map_err(|e| MarkovError::malformed(path, e.to_string()))
		}
	}
}

/// Builds the file path of the next lower backoff level.
///
/// Examples:
/// - `data/chain.json` → `data/chain_sub.json`
/// - `data/chain_sub.bin` → `data/chain_sub_sub.bin`
/// - `chain` → `chain_sub`
pub(crate) fn sub_chain_path<P: AsRef<Path>>(path: P) -> Result<PathBuf> {
	let path = path.as_ref();
	let stem = path
		.file_stem()
		.ok_or_else(|| MarkovError::invalid_argument(format!("path has no file name: {}", path.display())))?;

	let mut file_name = stem.to_os_string();
	file_name.push(SUB_CHAIN_SUFFIX);
	if let Some(extension) = path.extension() {
		file_name.push(".");
		file_name.push(extension);
	}

	Ok(path.with_file_name(file_name))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sub_chain_path_inserts_suffix_before_extension() {
		assert_eq!(sub_chain_path("data/chain.json").unwrap(), PathBuf::from("data/chain_sub.json"));
		assert_eq!(sub_chain_path("chain_sub.bin").unwrap(), PathBuf::from("chain_sub_sub.bin"));
		assert_eq!(sub_chain_path("chain").unwrap(), PathBuf::from("chain_sub"));
	}

	#[test]
	fn sub_chain_path_keeps_dots_in_directories() {
		assert_eq!(
			sub_chain_path("runs.v2/model.chain.json").unwrap(),
			PathBuf::from("runs.v2/model.chain_sub.json")
		);
	}

	#[test]
	fn format_follows_extension() {
		assert_eq!(Format::from_path("a.bin"), Format::Binary);
		assert_eq!(Format::from_path("a.json"), Format::Json);
		assert_eq!(Format::from_path("a.yml"), Format::Json);
		assert_eq!(Format::from_path("a"), Format::Json);
	}

	#[test]
	fn reading_a_missing_file_is_an_io_error() {
		let result: Result<Vec<u32>> = read_document("/definitely/not/here.json");
		assert!(matches!(result, Err(MarkovError::Io { .. })));
	}
}
