use std::path::Path;

use memmap2::Mmap;

use crate::error::{DataError, Result};

/// Encoding of samples in a raw signal file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SampleFormat {
    /// Little-endian 32-bit floats.
    F32,
    /// Little-endian IEEE half floats.
    F16,
}

impl SampleFormat {
    pub fn size_in_bytes(&self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::F16 => 2,
        }
    }
}

#[derive(Debug)]
enum Samples {
    Memory(Vec<f32>),
    Mapped { mmap: Mmap, format: SampleFormat },
}

/// A mono signal prompts are cut from.
///
/// Either held in memory or memory-mapped from a headerless file of raw
/// samples, so large corpora are read lazily.
#[derive(Debug)]
pub struct SignalBank {
    samples: Samples,
    sample_rate: u32,
}

impl SignalBank {
    pub fn from_samples(samples: Vec<f32>, sample_rate: u32) -> Self {
        SignalBank {
            samples: Samples::Memory(samples),
            sample_rate,
        }
    }

    /// Memory-map a raw sample file.
    pub fn open(path: &Path, format: SampleFormat, sample_rate: u32) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };
        if mmap.len() % format.size_in_bytes() != 0 {
            return Err(DataError::Malformed(format!(
                "{} bytes is not a whole number of {:?} samples",
                mmap.len(),
                format
            )));
        }
        let bank = SignalBank {
            samples: Samples::Mapped { mmap, format },
            sample_rate,
        };
        tracing::debug!(
            path = %path.display(),
            samples = bank.len(),
            sample_rate,
            "opened signal bank"
        );
        Ok(bank)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        match &self.samples {
            Samples::Memory(v) => v.len(),
            Samples::Mapped { mmap, format } => mmap.len() / format.size_in_bytes(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Converts a position in seconds to a sample index.
    pub fn seconds_to_index(&self, seconds: f64) -> usize {
        (seconds.max(0.0) * self.sample_rate as f64).round() as usize
    }

    /// Read `len` samples starting at `start`.
    pub fn read(&self, start: usize, len: usize) -> Result<Vec<f32>> {
        let end = start + len;
        if end > self.len() {
            return Err(DataError::OutOfRange {
                start,
                end,
                len: self.len(),
            });
        }
        Ok(match &self.samples {
            Samples::Memory(v) => v[start..end].to_vec(),
            Samples::Mapped { mmap, format } => {
                let size = format.size_in_bytes();
                let raw = &mmap[start * size..end * size];
                match format {
                    SampleFormat::F32 => raw
                        .chunks_exact(4)
                        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                        .collect(),
                    SampleFormat::F16 => raw
                        .chunks_exact(2)
                        .map(|b| half::f16::from_le_bytes([b[0], b[1]]).to_f32())
                        .collect(),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_f32(values: &[f32]) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for v in values {
            file.write_all(&v.to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_memory_bank() {
        let bank = SignalBank::from_samples(vec![0.0, 0.1, 0.2, 0.3], 4);
        assert_eq!(bank.len(), 4);
        assert_eq!(bank.read(1, 2).unwrap(), vec![0.1, 0.2]);
        assert!(bank.read(3, 2).is_err());
        assert_eq!(bank.seconds_to_index(0.5), 2);
    }

    #[test]
    fn test_mapped_f32() {
        let file = write_f32(&[1.0, -0.5, 0.25, 0.0, 2.0]);
        let bank = SignalBank::open(file.path(), SampleFormat::F32, 16000).unwrap();
        assert_eq!(bank.len(), 5);
        assert_eq!(bank.read(1, 3).unwrap(), vec![-0.5, 0.25, 0.0]);
        assert_eq!(bank.sample_rate(), 16000);
    }

    #[test]
    fn test_mapped_f16() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        for v in [0.5f32, -1.0, 0.125] {
            file.write_all(&half::f16::from_f32(v).to_le_bytes()).unwrap();
        }
        file.flush().unwrap();
        let bank = SignalBank::open(file.path(), SampleFormat::F16, 8000).unwrap();
        assert_eq!(bank.len(), 3);
        assert_eq!(bank.read(0, 3).unwrap(), vec![0.5, -1.0, 0.125]);
    }

    #[test]
    fn test_truncated_file_is_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(&[0u8; 6]).unwrap();
        file.flush().unwrap();
        let err = SignalBank::open(file.path(), SampleFormat::F32, 16000).unwrap_err();
        assert!(matches!(err, DataError::Malformed(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = SignalBank::open(Path::new("/nonexistent/signal.raw"), SampleFormat::F32, 1)
            .unwrap_err();
        assert!(matches!(err, DataError::Io(_)));
    }
}
