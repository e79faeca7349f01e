use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Polls `path` for growth, calling `on_chunk` with newly appended bytes.
/// A portable stand-in for an inode-change notification primitive (spec
/// §4.7 "Reads"). Returns once `running` is cleared, observed between polls
/// (spec §5 "Suspension points").
pub fn follow(
    path: impl AsRef<Path>,
    running: &AtomicBool,
    mut on_chunk: impl FnMut(&[u8]),
) -> std::io::Result<()> {
    let mut file = File::open(path)?;
    let mut offset = file.metadata()?.len();
    file.seek(SeekFrom::Start(offset))?;

    while running.load(Ordering::Relaxed) {
        let len = file.metadata()?.len();
        if len < offset {
            // The file shrank out from under us: wrap detected, restart from 0.
            offset = 0;
            file.seek(SeekFrom::Start(0))?;
        }
        if len > offset {
            let mut chunk = vec![0u8; (len - offset) as usize];
            file.read_exact(&mut chunk)?;
            on_chunk(&chunk);
            offset = len;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::thread;
    use tempfile::tempdir;

    #[test]
    fn follow_observes_appended_bytes_then_stops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.txt");
        File::create(&path).unwrap();

        let running = Arc::new(AtomicBool::new(true));
        let seen = Arc::new(Mutex::new(Vec::<u8>::new()));

        let path2 = path.clone();
        let running2 = Arc::clone(&running);
        let seen2 = Arc::clone(&seen);
        let handle = thread::spawn(move || {
            follow(&path2, &running2, |chunk| {
                seen2.lock().unwrap().extend_from_slice(chunk);
            })
            .unwrap();
        });

        thread::sleep(Duration::from_millis(50));
        {
            let mut f = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
            f.write_all(b"hello\n").unwrap();
        }
        thread::sleep(Duration::from_millis(350));
        running.store(false, Ordering::Relaxed);
        handle.join().unwrap();

        assert_eq!(&*seen.lock().unwrap(), b"hello\n");
    }
}
