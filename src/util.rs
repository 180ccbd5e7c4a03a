use std::{fs, io, path::Path};

/// Converts a not found error to Ok(false)
pub fn path_exists(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if matches!(e.kind(), io::ErrorKind::NotFound) => Ok(false),
        Err(e) => Err(e),
    }
}

pub fn header(header: &str) {
    let len = header.len();
    print!("\n{}\n", header);
    for _ in 0..len {
        print!("=");
    }
    println!("\n")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_paths_do_not_exist() {
        let dir = std::env::temp_dir();
        assert!(path_exists(&dir).unwrap());
        assert!(!path_exists(&dir.join("no-such-file-for-path-exists-test")).unwrap());
    }
}
