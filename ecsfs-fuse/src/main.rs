mod block_file;
mod cli;

use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::Path;
use std::sync::Arc;

use block_dev::BlockDevice;
use clap::Parser;
use ecsfs::Volume;
use typed_bytesize::ByteSizeIec;

use self::block_file::BlockFile;
use self::cli::{Cli, Command};

fn main() -> io::Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::info!("image={:?}", cli.image);

    match cli.command {
        Command::Format { size } => format(&cli.image, size),
        Command::Info => with_volume(&cli.image, |volume| {
            println!("{}", volume.info().map_err(fs_error)?);
            Ok(())
        }),
        Command::Ls => with_volume(&cli.image, |volume| {
            println!("FS Ls:");
            for record in volume.ls().map_err(fs_error)? {
                println!("{record}");
            }
            Ok(())
        }),
        Command::Add { host, name } => with_volume(&cli.image, |volume| add(volume, &host, name)),
        Command::Cat { name } => with_volume(&cli.image, |volume| {
            let fd = volume.open(&name).map_err(fs_error)?;
            let mut buf = vec![0u8; volume.stat(fd).map_err(fs_error)?];
            let read_size = volume.read(fd, &mut buf).map_err(fs_error)?;
            volume.close(fd).map_err(fs_error)?;
            io::stdout().write_all(&buf[..read_size])
        }),
        Command::Rm { name } => with_volume(&cli.image, |volume| {
            volume.delete(&name).map_err(fs_error)?;
            println!("Removed file '{name}'");
            Ok(())
        }),
        Command::Stat { name } => with_volume(&cli.image, |volume| {
            let fd = volume.open(&name).map_err(fs_error)?;
            let size = volume.stat(fd).map_err(fs_error)?;
            volume.close(fd).map_err(fs_error)?;
            println!("Size of file '{name}' is {size} bytes");
            Ok(())
        }),
    }
}

fn format(image: &Path, size: u64) -> io::Result<()> {
    let disk_size = ByteSizeIec::mib(size).0;
    let block_file = BlockFile::create(image, disk_size)?;
    let sb = Volume::format(&block_file).map_err(fs_error)?;
    block_file
        .close()
        .map_err(|e| fs_error(ecsfs::Error::Device(e)))?;
    println!(
        "formatted {} blocks, {} for data",
        sb.total_blocks(),
        sb.data_blocks()
    );
    Ok(())
}

/// 挂载镜像，执行`f`，成功后卸载写回
fn with_volume<F>(image: &Path, f: F) -> io::Result<()>
where
    F: FnOnce(&mut Volume) -> io::Result<()>,
{
    let block_dev: Arc<dyn BlockDevice> = Arc::new(BlockFile::open(image)?);
    let mut volume = Volume::mount(block_dev).map_err(fs_error)?;
    f(&mut volume)?;
    volume.unmount().map_err(fs_error)
}

fn add(volume: &mut Volume, host: &Path, name: Option<String>) -> io::Result<()> {
    let name = match name {
        Some(name) => name,
        None => host
            .file_name()
            .and_then(|fname| fname.to_str())
            .ok_or_else(|| io::Error::new(ErrorKind::InvalidInput, "bad host file name"))?
            .to_owned(),
    };
    let data = fs::read(host)?;

    volume.create(&name).map_err(fs_error)?;
    let fd = volume.open(&name).map_err(fs_error)?;
    let wrote_size = volume.write(fd, &data).map_err(fs_error)?;
    volume.close(fd).map_err(fs_error)?;

    if wrote_size < data.len() {
        log::warn!("volume full, {name:?} truncated to {wrote_size} bytes");
    }
    println!("Wrote file '{name}' ({wrote_size}/{} bytes)", data.len());
    Ok(())
}

fn fs_error(e: ecsfs::Error) -> io::Error {
    let kind = match e {
        ecsfs::Error::NotFound => ErrorKind::NotFound,
        ecsfs::Error::Duplicate => ErrorKind::AlreadyExists,
        ecsfs::Error::InvalidArgument => ErrorKind::InvalidInput,
        ecsfs::Error::InvalidVolume => ErrorKind::InvalidData,
        _ => ErrorKind::Other,
    };
    io::Error::new(kind, e)
}
