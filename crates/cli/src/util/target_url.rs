/// Split a target URL into the host:port to dial and the storage path
/// to request. Deliberately minimal — just enough to support the
/// `http://host:port/path` shape the `append`/`follow` binaries take,
/// without pulling in a full URL-parsing dependency.
pub fn split(url: &str) -> anyhow::Result<(String, String)> {
  let rest = url
    .strip_prefix("http://")
    .or_else(|| url.strip_prefix("https://"))
    .unwrap_or(url);
  let (addr, path) = match rest.find('/') {
    Some(idx) => (&rest[..idx], &rest[idx..]),
    None => (rest, "/"),
  };
  if addr.is_empty() {
    anyhow::bail!("invalid URL: missing host:port in {url:?}");
  }
  Ok((addr.to_string(), path.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn splits_scheme_host_and_path() {
    let (addr, path) = split("http://127.0.0.1:8080/foo/bar").unwrap();
    assert_eq!(addr, "127.0.0.1:8080");
    assert_eq!(path, "/foo/bar");
  }

  #[test]
  fn defaults_to_root_path() {
    let (addr, path) = split("http://127.0.0.1:8080").unwrap();
    assert_eq!(addr, "127.0.0.1:8080");
    assert_eq!(path, "/");
  }

  #[test]
  fn rejects_missing_host() {
    assert!(split("http:///foo").is_err());
  }
}
