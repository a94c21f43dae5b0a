use std::{
    fs::{self, File, OpenOptions},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

use anyhow::{anyhow, Result};
use chrono::{DateTime, Local, TimeDelta};
use rayon::prelude::*;

use crate::logging;

/// 預設單檔最大大小：10 MB
const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;
/// 預設保留天數：7 天
const DEFAULT_MAX_AGE_DAYS: i64 = 7;

/// A date-stamped log file that rolls over by day and by size.
///
/// The file name comes from a chrono pattern such as `log/%Y-%m-%d-http.log`.
/// When a file would grow past `max_size` a new generation is opened next to
/// it (`2025-02-03-http.1.log`, `2025-02-03-http.2.log`, ...). Generations only
/// increase within a day, so nothing is ever overwritten. Files in the same
/// directory older than `max_age` are removed whenever the day changes.
pub struct Rotate {
    fn_pattern: String,
    /// Current file name without the generation suffix.
    cur_base_fn: String,
    cur_fn: String,
    out_fh: Option<BufWriter<File>>,
    generation: u32,
    max_size: u64,
    current_size: u64,
    max_age: TimeDelta,
}

impl Rotate {
    pub fn new(fn_pattern: String) -> Self {
        Self::with_options(fn_pattern, DEFAULT_MAX_SIZE, DEFAULT_MAX_AGE_DAYS)
    }

    pub fn with_options(fn_pattern: String, max_size: u64, max_age_days: i64) -> Self {
        Rotate {
            fn_pattern,
            cur_base_fn: String::new(),
            cur_fn: String::new(),
            out_fh: None,
            generation: 0,
            max_size,
            current_size: 0,
            max_age: TimeDelta::try_days(max_age_days).unwrap_or(TimeDelta::days(7)),
        }
    }

    /// Appends `msg` to the file for `now`, rolling over first when needed.
    pub fn write_msg(&mut self, now: DateTime<Local>, msg: &[u8]) -> Result<()> {
        let base_fn = now.format(&self.fn_pattern).to_string();

        // 日期變更：重設 generation
        if base_fn != self.cur_base_fn || self.out_fh.is_none() {
            self.generation = 0;
            self.cur_base_fn = base_fn;
            self.open_new_file()?;
            self.cleanup_old_files(now);
        }

        if self.current_size > 0 && self.current_size + msg.len() as u64 > self.max_size {
            self.generation += 1;
            self.open_new_file()?;
        }

        let writer = self
            .out_fh
            .as_mut()
            .ok_or_else(|| anyhow!("No log file is open for {}", self.cur_base_fn))?;
        writer.write_all(msg)?;
        self.current_size += msg.len() as u64;

        Ok(())
    }

    pub fn flush(&mut self) {
        if let Some(writer) = self.out_fh.as_mut() {
            if let Err(why) = writer.flush() {
                logging::error_console(format!(
                    "Failed to flush {} because {:?}",
                    self.cur_fn, why
                ));
            }
        }
    }

    /// generation 0 keeps the base name, later ones insert `.N` before the extension.
    fn generate_full_fn(base_fn: &str, generation: u32) -> String {
        if generation == 0 {
            return base_fn.to_string();
        }

        let path = Path::new(base_fn);
        let parent = path.parent().unwrap_or(Path::new(""));
        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("log");
        let ext = path.extension().and_then(|s| s.to_str()).unwrap_or("log");

        parent
            .join(format!("{}.{}.{}", stem, generation, ext))
            .to_string_lossy()
            .to_string()
    }

    fn open_new_file(&mut self) -> Result<()> {
        self.flush();

        let filename = Self::generate_full_fn(&self.cur_base_fn, self.generation);
        if let Some(parent) = Path::new(&filename).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&filename)?;

        self.current_size = file.metadata().map(|m| m.len()).unwrap_or(0);
        self.out_fh = Some(BufWriter::with_capacity(4096, file));
        self.cur_fn = filename;

        Ok(())
    }

    fn cleanup_old_files(&self, now: DateTime<Local>) {
        let files = match Self::files_in_directory(&self.cur_fn) {
            Ok(files) => files,
            Err(why) => {
                logging::error_console(format!(
                    "Failed to list the log directory of {} because {:?}",
                    self.cur_fn, why
                ));
                return;
            }
        };

        let cut_off = (now - self.max_age).timestamp().max(0) as u64;
        let to_unlink: Vec<PathBuf> = files
            .into_iter()
            .filter(|file| {
                fs::metadata(file)
                    .and_then(|metadata| metadata.modified())
                    .ok()
                    .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
                    .is_some_and(|age| age.as_secs() <= cut_off)
            })
            .collect();

        to_unlink
            .par_iter()
            .with_min_len(num_cpus::get())
            .for_each(|unlink| {
                if let Err(why) = fs::remove_file(unlink) {
                    logging::error_console(format!(
                        "couldn't remove the file({}). because {:?}",
                        unlink.display(),
                        why
                    ));
                }
            });
    }

    /// Log files living next to `file_path`.
    fn files_in_directory<P: AsRef<Path>>(file_path: P) -> Result<Vec<PathBuf>, io::Error> {
        let parent_dir = match file_path.as_ref().parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(parent_dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "log") {
                files.push(path);
            }
        }

        Ok(files)
    }
}

impl Drop for Rotate {
    fn drop(&mut self) {
        self.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "previous_close-{}-{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_generation_filename() {
        let base = "log/2025-02-03-app.log";
        assert_eq!(Rotate::generate_full_fn(base, 0), "log/2025-02-03-app.log");
        assert_eq!(Rotate::generate_full_fn(base, 1), "log/2025-02-03-app.1.log");
        assert_eq!(Rotate::generate_full_fn(base, 2), "log/2025-02-03-app.2.log");
    }

    #[test]
    fn test_basic_write() {
        let dir = scratch_dir("basic");
        let pattern = dir.join("%Y-%m-%d-basic.log").to_string_lossy().to_string();
        let now = Local::now();

        let mut r = Rotate::new(pattern.clone());
        r.write_msg(now, b"first line\n").unwrap();
        r.write_msg(now, b"second line\n").unwrap();
        r.flush();

        let written = fs::read_to_string(now.format(&pattern).to_string()).unwrap();
        assert_eq!(written, "first line\nsecond line\n");

        let _ = fs::remove_dir_all(dir);
    }

    /// generation 只增不減，且不會覆蓋舊檔案
    #[test]
    fn test_size_rotation_never_overwrites() {
        let dir = scratch_dir("size");
        let pattern = dir.join("%Y-%m-%d-size.log").to_string_lossy().to_string();
        let now = Local::now();

        let mut r = Rotate::with_options(pattern, 512, 7);
        for i in 0..50 {
            let msg = format!("Line {:03} - {}\n", i, "X".repeat(50));
            r.write_msg(now, msg.as_bytes()).unwrap();
        }
        r.flush();

        let final_generation = r.generation;
        assert!(final_generation >= 3, "generation: {}", final_generation);

        let files: HashSet<String> = fs::read_dir(&dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(files.len() as u32, final_generation + 1, "{:?}", files);

        let base = now.format("%Y-%m-%d-size").to_string();
        for gen in 0..=final_generation {
            let expected = if gen == 0 {
                format!("{}.log", base)
            } else {
                format!("{}.{}.log", base, gen)
            };
            assert!(files.contains(&expected), "missing {}", expected);
        }

        let _ = fs::remove_dir_all(dir);
    }

    #[test]
    fn test_date_rotation() {
        let dir = scratch_dir("date");
        let pattern = dir.join("%Y-%m-%d-date.log").to_string_lossy().to_string();
        let today = Local::now();
        let tomorrow = today + TimeDelta::try_days(1).unwrap();

        let mut r = Rotate::new(pattern.clone());
        r.write_msg(today, b"day 1\n").unwrap();
        r.write_msg(tomorrow, b"day 2\n").unwrap();
        r.flush();

        assert_eq!(r.generation, 0);
        assert_eq!(
            fs::read_to_string(today.format(&pattern).to_string()).unwrap(),
            "day 1\n"
        );
        assert_eq!(
            fs::read_to_string(tomorrow.format(&pattern).to_string()).unwrap(),
            "day 2\n"
        );

        let _ = fs::remove_dir_all(dir);
    }
}
