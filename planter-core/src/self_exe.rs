use std::io;

/// Absolute path of the running binary, used when an emitted instruction has
/// to re-invoke one of our own subcommands on the node.
pub fn self_exe() -> io::Result<String> {
    std::env::current_exe()?
        .into_os_string()
        .into_string()
        .map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                "executable path is not valid utf-8",
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_an_absolute_path() {
        let path = self_exe().unwrap();

        assert!(path.starts_with('/'));
    }
}
