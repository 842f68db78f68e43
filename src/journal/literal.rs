//! Strict parser and renderer for the `{'label': 0.5, ...}` score literal.
//!
//! Accepts exactly one flat mapping of quoted string keys to numbers. Anything
//! else (nested values, bare identifiers, calls, duplicate keys) is an error.
//!
//! Rendering follows Python's float `repr`: positional notation for
//! magnitudes in `[1e-4, 1e16)`, otherwise `1e-05` style with a signed,
//! two-digit exponent.

use super::ParseError;
use crate::tracker::EmotionScores;

/// Parse a score literal such as `{'sad': 0.9, 'happy': 0.1}`.
pub fn parse_scores(input: &str) -> Result<EmotionScores, ParseError> {
    let mut parser = LiteralParser::new(input);
    let scores = parser.mapping()?;
    parser.skip_ws();
    if let Some(c) = parser.peek() {
        return Err(parser.unexpected(c, "end of input"));
    }
    Ok(scores)
}

/// Render scores in the literal form the legacy log uses.
pub fn render_scores(scores: &EmotionScores) -> String {
    let parts: Vec<String> = scores
        .iter()
        .map(|(label, score)| format!("'{}': {}", label, render_float(score)))
        .collect();
    format!("{{{}}}", parts.join(", "))
}

/// Shortest round-trip text for `value`, always carrying a fractional part
/// or an exponent.
pub fn render_float(value: f64) -> String {
    let magnitude = value.abs();
    if value.is_finite() && magnitude != 0.0 && !(1e-4..1e16).contains(&magnitude) {
        return render_exponent(value);
    }
    let text = format!("{}", value);
    if text.contains(['.', 'e', 'E']) || !value.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

fn render_exponent(value: f64) -> String {
    let text = format!("{:e}", value);
    match text.split_once('e') {
        Some((mantissa, exp)) => {
            let (sign, digits) = match exp.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exp),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => text,
    }
}

struct LiteralParser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> LiteralParser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn expect(&mut self, want: char) -> Result<(), ParseError> {
        match self.peek() {
            Some(c) if c == want => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.unexpected(c, &format!("'{}'", want))),
            None => Err(ParseError::Literal {
                pos: self.pos,
                message: format!("unexpected end of input, expected '{}'", want),
            }),
        }
    }

    fn unexpected(&self, found: char, expected: &str) -> ParseError {
        ParseError::Literal {
            pos: self.pos,
            message: format!("unexpected {:?}, expected {}", found, expected),
        }
    }

    // mapping := '{' (entry (',' entry)* ','?)? '}'
    fn mapping(&mut self) -> Result<EmotionScores, ParseError> {
        let mut scores = EmotionScores::new();
        self.skip_ws();
        self.expect('{')?;
        self.skip_ws();
        if self.peek() == Some('}') {
            self.bump();
            return Ok(scores);
        }

        loop {
            self.skip_ws();
            let key_pos = self.pos;
            let key = self.string()?;
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.number()?;
            if scores.insert(key.clone(), value).is_some() {
                return Err(ParseError::Literal {
                    pos: key_pos,
                    message: format!("duplicate key {:?}", key),
                });
            }

            self.skip_ws();
            match self.bump() {
                Some(',') => {
                    self.skip_ws();
                    if self.peek() == Some('}') {
                        self.bump();
                        return Ok(scores);
                    }
                }
                Some('}') => return Ok(scores),
                Some(c) => {
                    self.pos -= c.len_utf8();
                    return Err(self.unexpected(c, "',' or '}'"));
                }
                None => {
                    return Err(ParseError::Literal {
                        pos: self.pos,
                        message: "unterminated mapping".to_string(),
                    })
                }
            }
        }
    }

    // string := '\'' chars '\'' | '"' chars '"'   (only \\ and \<quote> escapes)
    fn string(&mut self) -> Result<String, ParseError> {
        let quote = match self.peek() {
            Some(q @ ('\'' | '"')) => q,
            Some(c) => return Err(self.unexpected(c, "quoted key")),
            None => {
                return Err(ParseError::Literal {
                    pos: self.pos,
                    message: "unexpected end of input, expected quoted key".to_string(),
                })
            }
        };
        self.bump();

        let mut out = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => break,
                Some('\\') => match self.bump() {
                    Some(c @ ('\\' | '\'' | '"')) => out.push(c),
                    Some(c) => {
                        self.pos -= c.len_utf8();
                        return Err(self.unexpected(c, "escaped quote or backslash"));
                    }
                    None => {
                        return Err(ParseError::Literal {
                            pos: self.pos,
                            message: "unterminated string".to_string(),
                        })
                    }
                },
                Some(c) if c.is_control() => {
                    self.pos -= c.len_utf8();
                    return Err(self.unexpected(c, "key character"));
                }
                Some(c) => out.push(c),
                None => {
                    return Err(ParseError::Literal {
                        pos: self.pos,
                        message: "unterminated string".to_string(),
                    })
                }
            }
        }

        if out.is_empty() {
            return Err(ParseError::Literal {
                pos: self.pos,
                message: "empty key".to_string(),
            });
        }
        Ok(out)
    }

    // number := sign? (digits ('.' digits?)? | '.' digits) (('e'|'E') sign? digits)?
    fn number(&mut self) -> Result<f64, ParseError> {
        let start = self.pos;
        if matches!(self.peek(), Some('+' | '-')) {
            self.bump();
        }
        let int_digits = self.digits();
        let mut frac_digits = 0;
        if self.peek() == Some('.') {
            self.bump();
            frac_digits = self.digits();
        }
        if int_digits == 0 && frac_digits == 0 {
            return Err(ParseError::Literal {
                pos: start,
                message: "expected number".to_string(),
            });
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            self.bump();
            if matches!(self.peek(), Some('+' | '-')) {
                self.bump();
            }
            if self.digits() == 0 {
                return Err(ParseError::Literal {
                    pos: self.pos,
                    message: "expected exponent digits".to_string(),
                });
            }
        }

        let text = &self.src[start..self.pos];
        let value: f64 = text.parse().map_err(|_| ParseError::Literal {
            pos: start,
            message: format!("invalid number {:?}", text),
        })?;
        if !value.is_finite() || value < 0.0 {
            return Err(ParseError::Literal {
                pos: start,
                message: format!("score out of range: {}", text),
            });
        }
        Ok(value)
    }

    fn digits(&mut self) -> usize {
        let mut n = 0;
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.bump();
            n += 1;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_single_quoted_literal() {
        let scores = parse_scores("{'sad': 0.9, 'happy': 0.1}").unwrap();
        assert_eq!(scores.get("sad"), Some(0.9));
        assert_eq!(scores.get("happy"), Some(0.1));
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn parses_double_quotes_exponents_and_trailing_comma() {
        let scores = parse_scores(r#" { "angry" : 1e-3, 'fear': .5, "neutral": 2., } "#).unwrap();
        assert_eq!(scores.get("angry"), Some(0.001));
        assert_eq!(scores.get("fear"), Some(0.5));
        assert_eq!(scores.get("neutral"), Some(2.0));
    }

    #[test]
    fn parses_empty_mapping() {
        assert!(parse_scores("{}").unwrap().is_empty());
    }

    #[test]
    fn rejects_code_and_garbage() {
        for bad in [
            "__import__('os').system('rm -rf /')",
            "{'a': os.getcwd()}",
            "{'a': 0.1",
            "{'a' 0.1}",
            "{a: 0.1}",
            "{'a': 0.1} extra",
            "{'a': -0.1}",
            "{'a': nan}",
            "{'a': 0.1, 'a': 0.2}",
            "{'a': {'b': 1}}",
            "{'': 1.0}",
            "",
        ] {
            assert!(parse_scores(bad).is_err(), "should reject {:?}", bad);
        }
    }

    #[test]
    fn renders_python_style_floats() {
        assert_eq!(render_float(1.0), "1.0");
        assert_eq!(render_float(0.25), "0.25");
        assert_eq!(render_float(0.0), "0.0");
        assert_eq!(render_float(0.0001), "0.0001");
        assert_eq!(render_float(1e-5), "1e-05");
        assert_eq!(render_float(1.5e-7), "1.5e-07");
        assert_eq!(render_float(1e16), "1e+16");
        assert_eq!(render_float(1e100), "1e+100");
        assert_eq!(parse_scores("{'a': 1e-05}").unwrap().get("a"), Some(1e-5));
    }

    #[test]
    fn render_matches_legacy_shape() {
        let scores: EmotionScores = [("sad", 0.9), ("happy", 0.1)].into_iter().collect();
        assert_eq!(render_scores(&scores), "{'happy': 0.1, 'sad': 0.9}");
    }

    proptest! {
        #[test]
        fn rendered_scores_parse_back(
            entries in prop::collection::btree_map("[a-z_]{1,10}", 0.0f64..1.0e6, 0..10)
        ) {
            let scores: EmotionScores = entries.into_iter().collect();
            let parsed = parse_scores(&render_scores(&scores)).unwrap();
            prop_assert_eq!(parsed, scores);
        }
    }
}
