//! Read raw samples from a file.
use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use log::debug;

use crate::block::{Block, BlockRet};
use crate::stream::{Streamp, new_streamp};
use crate::{Result, Sample};

/// Read raw little endian samples from a file.
pub struct FileSource<T> {
    f: BufReader<File>,
    dst: Streamp<T>,
    repeat: bool,
    buf: Vec<u8>,
}

impl<T: Sample<Type = T> + Copy> FileSource<T> {
    /// Create a new FileSource, reading from the given file.
    pub fn new<P: AsRef<Path>>(filename: P, repeat: bool) -> Result<Self> {
        let f = BufReader::new(File::open(&filename)?);
        debug!("Opening source {}", filename.as_ref().display());
        Ok(Self {
            f,
            dst: new_streamp(),
            repeat,
            buf: Vec::new(),
        })
    }

    /// Get the output stream.
    pub fn out(&self) -> Streamp<T> {
        self.dst.clone()
    }
}

impl<T: Sample<Type = T> + Copy> Block for FileSource<T> {
    fn block_name(&self) -> &'static str {
        "FileSource"
    }
    fn work(&mut self) -> Result<BlockRet> {
        let mut chunk = [0u8; 8192];
        let n = self.f.read(&mut chunk)?;
        if n == 0 {
            if !self.repeat {
                return Ok(BlockRet::EOF);
            }
            self.f.seek(SeekFrom::Start(0))?;
            return Ok(BlockRet::Ok);
        }
        self.buf.extend(&chunk[..n]);
        let size = T::size();
        let mut samples = Vec::with_capacity(self.buf.len() / size);
        let mut pos = 0;
        while pos + size <= self.buf.len() {
            samples.push(T::parse(&self.buf[pos..pos + size])?);
            pos += size;
        }
        self.buf.drain(..pos);
        self.dst.lock()?.write_slice(&samples);
        Ok(BlockRet::Ok)
    }
}
