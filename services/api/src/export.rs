use clap::Args;
use smart_kyc::error::AppError;
use smart_kyc::workflows::kyc::{write_status_csv, ApplicationRepository, JsonFileRepository};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// JSON application store to read
    #[arg(long)]
    pub(crate) data_file: PathBuf,
    /// Destination CSV file (defaults to stdout)
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs { data_file, output } = args;

    match output {
        Some(path) => {
            let count = export_store(&data_file, File::create(&path)?)?;
            println!("Exported {count} applications to {}", path.display());
        }
        None => {
            export_store(&data_file, io::stdout().lock())?;
        }
    }
    Ok(())
}

/// Write every application in the store at `data_file` as CSV and return how many were written.
///
/// A missing store is an error; the export never creates files or directories.
pub(crate) fn export_store<W: io::Write>(data_file: &Path, writer: W) -> Result<usize, AppError> {
    if !data_file.is_file() {
        return Err(AppError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("application store {} does not exist", data_file.display()),
        )));
    }
    let repository = JsonFileRepository::open(data_file)?;
    let records = repository.list(usize::MAX)?;
    write_status_csv(writer, &records)?;
    Ok(records.len())
}
