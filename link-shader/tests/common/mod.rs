#![allow(dead_code)]

use link_shader::link_code;
use link_shader::Defines;
use link_shader::LinkOptions;
use parse_shader::dialect::Dialect;
use similar::TextDiff;

/// Replaces generated namespaces with `_A_`, `_B_`, ... in order of first appearance.
pub fn normalize(code: &str) -> String {
  let bytes = code.as_bytes();
  let mut seen: Vec<&str> = Vec::new();
  let mut out = String::with_capacity(code.len());
  let mut i = 0;
  while i < code.len() {
    let boundary = i == 0 || !(bytes[i - 1].is_ascii_alphanumeric() || bytes[i - 1] == b'_');
    if boundary && bytes[i] == b'_' {
      let digits = bytes[i + 1..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || b.is_ascii_lowercase())
        .count();
      let end = i + 1 + digits;
      if digits >= 4 && bytes.get(end) == Some(&b'_') {
        let ns = &code[i..=end];
        let n = match seen.iter().position(|s| *s == ns) {
          Some(n) => n,
          None => {
            seen.push(ns);
            seen.len() - 1
          }
        };
        out.push('_');
        out.push((b'A' + n as u8) as char);
        out.push('_');
        i = end + 1;
        continue;
      }
    }
    let Some(c) = code[i..].chars().next() else {
      break;
    };
    out.push(c);
    i += c.len_utf8();
  }
  out
}

pub fn link(
  dialect: Dialect,
  code: &str,
  libraries: &[(&str, &str)],
  links: &[(&str, &str)],
  defines: &Defines,
) -> String {
  let options = LinkOptions::new(dialect);
  let linked = link_code(&options, code, libraries, links, defines, None).unwrap();
  let compact = link_code(
    &options.with_compressed(true),
    code,
    libraries,
    links,
    defines,
    None,
  )
  .unwrap();
  assert_same(&linked, &compact);
  normalize(&linked)
}

pub fn assert_same(expected: &str, actual: &str) {
  if expected != actual {
    let diff = TextDiff::from_lines(expected, actual);
    panic!("outputs differ:\n{}", diff.unified_diff().header("expected", "actual"));
  }
}
