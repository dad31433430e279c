//! Trace source: Dinero-style records of `op address data`

use std::fs::File;
use std::io::BufRead;
use std::io::BufReader;
use std::path::Path;

use crate::error::SimulatorResult;
use crate::error::TraceError;

/// Kind of memory request carried by a trace record
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    DataRead,
    DataWrite,
    InstructionFetch,
}

impl Operation {
    /// Decode the numeric operation code used in trace files
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "0" => Some(Operation::DataRead),
            "1" => Some(Operation::DataWrite),
            "2" => Some(Operation::InstructionFetch),
            _ => None,
        }
    }
}

/// One line of a trace
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    pub operation: Operation,
    pub address: u64,
    /// Payload carried by the trace; never affects the simulation
    pub data: u64,
}

impl TraceRecord {
    pub fn new(operation: Operation, address: u64) -> Self {
        Self {
            operation,
            address,
            data: 0,
        }
    }
}

fn parse_hex(
    line: usize,
    field: &'static str,
    value: &str,
) -> Result<u64, TraceError> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u64::from_str_radix(digits, 16).map_err(|_| TraceError::InvalidHex {
        line,
        field,
        value: value.to_string(),
    })
}

/// Parse a single non-empty trace line.
/// `line` is the 1-based line number used for error reporting.
pub fn parse_line(line: usize, text: &str) -> Result<TraceRecord, TraceError> {
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 3 {
        return Err(TraceError::FieldCount {
            line,
            found: parts.len(),
        });
    }

    let operation = Operation::from_code(parts[0]).ok_or_else(|| {
        TraceError::UnknownOperation {
            line,
            code: parts[0].to_string(),
        }
    })?;
    let address = parse_hex(line, "address", parts[1])?;
    let data = parse_hex(line, "data", parts[2])?;

    Ok(TraceRecord {
        operation,
        address,
        data,
    })
}

/// Sequential reader yielding one record per non-blank line
pub struct TraceReader<R: BufRead> {
    lines: std::io::Lines<R>,
    line_num: usize,
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = SimulatorResult<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            self.line_num += 1;

            // Skip empty lines
            if line.trim().is_empty() {
                continue;
            }

            return Some(parse_line(self.line_num, &line).map_err(Into::into));
        }
    }
}

/// Read every record of the trace file at `path`
pub fn read_trace(path: &Path) -> SimulatorResult<Vec<TraceRecord>> {
    let file = File::open(path)
        .map_err(|e| TraceError::FileReadError(path.to_path_buf(), e))?;
    let records = TraceReader::new(BufReader::new(file))
        .collect::<SimulatorResult<Vec<_>>>()?;
    log::debug!("read {} records from {}", records.len(), path.display());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimulatorError;
    use std::io::Cursor;
    use std::io::Write;

    #[test]
    fn test_parse_line() {
        let record = parse_line(1, "2 408ed4 0").unwrap();
        assert_eq!(record.operation, Operation::InstructionFetch);
        assert_eq!(record.address, 0x408ed4);
        assert_eq!(record.data, 0);

        let record = parse_line(1, "1  0x10010000\tdeadbeef").unwrap();
        assert_eq!(record.operation, Operation::DataWrite);
        assert_eq!(record.address, 0x10010000);
        assert_eq!(record.data, 0xdeadbeef);
    }

    #[test]
    fn test_wrong_field_count() {
        match parse_line(7, "0 1000") {
            Err(TraceError::FieldCount { line, found }) => {
                assert_eq!(line, 7);
                assert_eq!(found, 2);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_operation() {
        assert!(matches!(
            parse_line(3, "3 1000 0"),
            Err(TraceError::UnknownOperation { line: 3, .. })
        ));
    }

    #[test]
    fn test_non_hex_address() {
        assert!(matches!(
            parse_line(2, "0 10zz 0"),
            Err(TraceError::InvalidHex { field: "address", .. })
        ));
    }

    #[test]
    fn test_reader_skips_blank_lines_and_counts_lines() {
        let input = "0 1000 0\n\n   \n1 2000 ff\nbogus\n";
        let mut reader = TraceReader::new(Cursor::new(input));

        assert_eq!(
            reader.next().unwrap().unwrap(),
            TraceRecord::new(Operation::DataRead, 0x1000)
        );
        let second = reader.next().unwrap().unwrap();
        assert_eq!(second.operation, Operation::DataWrite);
        assert_eq!(second.data, 0xff);
        match reader.next() {
            Some(Err(SimulatorError::TraceError(TraceError::FieldCount {
                line,
                ..
            }))) => assert_eq!(line, 5),
            other => panic!("unexpected result: {:?}", other),
        }
        assert!(reader.next().is_none());
    }

    #[test]
    fn test_read_trace_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "2 0 0").unwrap();
        writeln!(file, "0 40 0").unwrap();
        let records = read_trace(file.path()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].address, 0x40);
    }

    #[test]
    fn test_read_missing_file() {
        let result = read_trace(Path::new("/definitely/not/here.din"));
        assert!(matches!(
            result,
            Err(SimulatorError::TraceError(TraceError::FileReadError(..)))
        ));
    }
}
