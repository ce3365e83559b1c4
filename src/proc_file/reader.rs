//! Reads a compiled map back far enough to validate it and count its parts.

use crate::errors::ReadError;
use crate::proc_file::ProcFile;
use std::path::Path;

/// Section counts of a compiled map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcSummary {
    pub version: u32,
    pub num_planes: usize,
    pub num_entities: usize,
    pub num_areas: usize,
    pub num_groups: usize,
    pub num_tris: usize,
    pub num_lights: usize,
    pub num_inter_area_portals: usize,
    pub leaked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    Quoted(&'a str),
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, ReadError> {
    let mut tokens = Vec::new();
    let mut rest = text;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return Ok(tokens);
        }
        if let Some(body) = rest.strip_prefix('"') {
            let end = body.find('"').ok_or_else(|| ReadError::Malformed {
                position: tokens.len(),
                message: "unterminated string".into(),
            })?;
            tokens.push(Token::Quoted(&body[..end]));
            rest = &body[end + 1..];
        } else {
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            tokens.push(Token::Word(&rest[..end]));
            rest = &rest[end..];
        }
    }
}

struct Cursor<'a> {
    tokens: Vec<Token<'a>>,
    position: usize,
}

impl<'a> Cursor<'a> {
    fn malformed(&self, message: impl Into<String>) -> ReadError {
        ReadError::Malformed {
            position: self.position,
            message: message.into(),
        }
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.tokens.get(self.position).cloned();
        self.position += 1;
        token
    }

    fn word(&mut self) -> Result<&'a str, ReadError> {
        match self.next() {
            Some(Token::Word(word)) => Ok(word),
            _ => Err(self.malformed("expected a word")),
        }
    }

    fn number<T: std::str::FromStr>(&mut self) -> Result<T, ReadError> {
        let word = self.word()?;
        word.parse().map_err(|_| self.malformed(format!("expected a number, found {word:?}")))
    }
}

impl ProcSummary {
    pub fn read(path: &Path) -> Result<Self, ReadError> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ReadError> {
        let mut cursor = Cursor {
            tokens: tokenize(text)?,
            position: 0,
        };
        if cursor.word()? != ProcFile::HEADER {
            return Err(cursor.malformed("missing header"));
        }
        let version: u32 = cursor.number()?;
        if version != ProcFile::VERSION {
            return Err(ReadError::VersionMismatch {
                found: version,
                expected: ProcFile::VERSION,
            });
        }

        let mut summary = ProcSummary { version, ..Default::default() };
        // words of the group header being read, up to its opening brace
        let mut group_header: Option<Vec<&str>> = None;
        while let Some(token) = cursor.next() {
            let Token::Word(word) = token else {
                continue;
            };
            match word {
                "planes" => summary.num_planes = cursor.number()?,
                "entity" => summary.num_entities += 1,
                "area" => summary.num_areas += 1,
                "group" => {
                    summary.num_groups += 1;
                    group_header = Some(Vec::new());
                },
                "{" => {
                    if let Some(header) = group_header.take() {
                        // group headers end with the vertex and index counts
                        let indexes: usize = header
                            .last()
                            .and_then(|w| w.parse().ok())
                            .ok_or_else(|| cursor.malformed("bad index count"))?;
                        summary.num_tris += indexes / 3;
                    }
                },
                "lights" => summary.num_lights = cursor.number()?,
                "interAreaPortals" => {
                    let _areas: usize = cursor.number()?;
                    summary.num_inter_area_portals = cursor.number()?;
                },
                "leak" => {
                    summary.leaked = cursor.number::<u8>()? != 0;
                    break;
                },
                _ => {
                    if let Some(header) = &mut group_header {
                        header.push(word);
                    }
                },
            }
        }
        Ok(summary)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn version_is_checked() {
        let err = ProcSummary::parse("compiledMapFile 2\nplanes 0\nleak 0\n").unwrap_err();
        assert!(matches!(err, ReadError::VersionMismatch { found: 2, expected: ProcFile::VERSION }));
    }

    #[test]
    fn missing_header_is_malformed() {
        let err = ProcSummary::parse("mapProcFile003\n").unwrap_err();
        assert!(matches!(err, ReadError::Malformed { .. }));
    }

    #[test]
    fn quoted_names_do_not_count() {
        let text = format!(
            "{} {}\nplanes 2\nentity 0 \"entity\" \"worldspawn\" ( 0 0 0 ) {{\n\tareas 1\n\tarea 0 1 {{\n\t\tgroup \"area\" 0 0 0 1 0 ( ) 3 3 {{\n\t\t\t( 0 0 0 0 0 0 0 1 )\n\t\t\t0 1 2\n\t\t}}\n\t}}\n}}\nlights 0 {{\n}}\ninterAreaPortals 1 0 {{\n}}\nleak 1 0 0\n",
            ProcFile::HEADER,
            ProcFile::VERSION
        );
        let summary = ProcSummary::parse(&text).unwrap();
        assert_eq!(summary.num_planes, 2);
        assert_eq!(summary.num_entities, 1);
        assert_eq!(summary.num_areas, 1);
        assert_eq!(summary.num_groups, 1);
        assert_eq!(summary.num_tris, 1);
        assert!(summary.leaked);
    }
}
