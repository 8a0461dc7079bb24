use super::{
    AttrOperator, Combinator, ComplexSelector, CompoundSelector, Nth, SelectorError,
    SimpleSelector,
};

pub(super) fn parse_list(input: &str) -> Result<Vec<ComplexSelector>, SelectorError> {
    let mut p = Parser {
        chars: input.chars().collect(),
        pos: 0,
    };

    p.skip_ws();
    if p.at_end() {
        return Err(SelectorError::Empty);
    }

    let mut list = vec![p.complex()?];
    loop {
        p.skip_ws();
        match p.peek() {
            None => break,
            Some(',') => {
                p.bump();
                p.skip_ws();
                if p.at_end() {
                    return Err(SelectorError::DanglingCombinator { pos: p.pos });
                }
                list.push(p.complex()?);
            }
            Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: p.pos }),
        }
    }
    Ok(list)
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += 1;
        Some(ch)
    }

    fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    /// Returns whether any whitespace was skipped.
    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(ch) => SelectorError::UnexpectedChar { ch, pos: self.pos },
            None => SelectorError::ExpectedName { pos: self.pos },
        }
    }

    fn complex(&mut self) -> Result<ComplexSelector, SelectorError> {
        let mut compounds = vec![self.compound()?];
        let mut combinators = Vec::new();

        loop {
            let had_ws = self.skip_ws();
            let combinator = match self.peek() {
                None | Some(',') => break,
                Some('>') => Combinator::Child,
                Some('+') => Combinator::NextSibling,
                Some('~') => Combinator::SubsequentSibling,
                Some(_) if had_ws => Combinator::Descendant,
                Some(ch) => return Err(SelectorError::UnexpectedChar { ch, pos: self.pos }),
            };
            let combinator_pos = self.pos;
            if combinator != Combinator::Descendant {
                self.bump();
                self.skip_ws();
            }
            if matches!(self.peek(), None | Some(',')) {
                return Err(SelectorError::DanglingCombinator {
                    pos: combinator_pos,
                });
            }
            compounds.push(self.compound()?);
            combinators.push(combinator);
        }

        Ok(ComplexSelector {
            compounds,
            combinators,
        })
    }

    fn compound(&mut self) -> Result<CompoundSelector, SelectorError> {
        let start = self.pos;
        let mut compound = CompoundSelector::default();

        match self.peek() {
            Some('*') => {
                self.bump();
            }
            Some(ch) if is_name_start(ch) => {
                compound.tag = Some(self.name()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.bump();
                    compound.simple.push(SimpleSelector::Id(self.name()?));
                }
                Some('.') => {
                    self.bump();
                    compound.simple.push(SimpleSelector::Class(self.name()?));
                }
                Some('[') => {
                    let attr = self.attribute()?;
                    compound.simple.push(attr);
                }
                Some(':') => {
                    let pseudo = self.pseudo()?;
                    compound.simple.push(pseudo);
                }
                _ => break,
            }
        }

        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(compound)
    }

    /// An identifier; backslash escapes the next character.
    fn name(&mut self) -> Result<String, SelectorError> {
        let mut name = String::new();
        while let Some(ch) = self.peek() {
            if ch == '\\' {
                self.bump();
                match self.bump() {
                    Some(escaped) => name.push(escaped),
                    None => break,
                }
            } else if is_name_char(ch) {
                name.push(ch);
                self.bump();
            } else {
                break;
            }
        }

        if name.is_empty() {
            return Err(SelectorError::ExpectedName { pos: self.pos });
        }
        Ok(name)
    }

    fn attribute(&mut self) -> Result<SimpleSelector, SelectorError> {
        let open = self.pos;
        self.bump();
        self.skip_ws();
        let name = self.name()?.to_ascii_lowercase();
        self.skip_ws();

        let operator = match (self.peek(), self.peek_at(1)) {
            (Some(']'), _) => {
                self.bump();
                return Ok(SimpleSelector::Attribute {
                    name,
                    matcher: None,
                });
            }
            (Some('='), _) => Some((AttrOperator::Equals, 1)),
            (Some('~'), Some('=')) => Some((AttrOperator::Includes, 2)),
            (Some('|'), Some('=')) => Some((AttrOperator::DashMatch, 2)),
            (Some('^'), Some('=')) => Some((AttrOperator::Prefix, 2)),
            (Some('$'), Some('=')) => Some((AttrOperator::Suffix, 2)),
            (Some('*'), Some('=')) => Some((AttrOperator::Substring, 2)),
            (None, _) => return Err(SelectorError::UnterminatedAttribute { pos: open }),
            _ => None,
        };
        let Some((operator, width)) = operator else {
            return Err(self.unexpected());
        };
        self.pos += width;
        self.skip_ws();

        let value = match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.bump();
                let mut value = String::new();
                loop {
                    match self.bump() {
                        Some(ch) if ch == quote => break,
                        Some('\\') => {
                            if let Some(escaped) = self.bump() {
                                value.push(escaped);
                            }
                        }
                        Some(ch) => value.push(ch),
                        None => return Err(SelectorError::UnterminatedAttribute { pos: open }),
                    }
                }
                value
            }
            None => return Err(SelectorError::UnterminatedAttribute { pos: open }),
            Some(_) => self.name()?,
        };

        self.skip_ws();
        match self.bump() {
            Some(']') => Ok(SimpleSelector::Attribute {
                name,
                matcher: Some((operator, value)),
            }),
            Some(ch) => Err(SelectorError::UnexpectedChar {
                ch,
                pos: self.pos - 1,
            }),
            None => Err(SelectorError::UnterminatedAttribute { pos: open }),
        }
    }

    fn pseudo(&mut self) -> Result<SimpleSelector, SelectorError> {
        self.bump();
        let name = self.name()?.to_ascii_lowercase();
        match name.as_str() {
            "first-child" => Ok(SimpleSelector::FirstChild),
            "last-child" => Ok(SimpleSelector::LastChild),
            "only-child" => Ok(SimpleSelector::OnlyChild),
            "nth-child" => {
                let open = self.pos;
                if self.bump() != Some('(') {
                    return Err(SelectorError::UnterminatedPseudo { pos: open });
                }
                let mut arg = String::new();
                loop {
                    match self.bump() {
                        Some(')') => break,
                        Some(ch) => arg.push(ch),
                        None => return Err(SelectorError::UnterminatedPseudo { pos: open }),
                    }
                }
                parse_nth(arg.trim()).map(SimpleSelector::NthChild)
            }
            _ => Err(SelectorError::UnknownPseudo(name)),
        }
    }
}

fn parse_nth(arg: &str) -> Result<Nth, SelectorError> {
    match arg.to_ascii_lowercase().as_str() {
        "odd" => Ok(Nth::Odd),
        "even" => Ok(Nth::Even),
        digits => match digits.parse::<usize>() {
            Ok(n) if n > 0 => Ok(Nth::Index(n)),
            _ => Err(SelectorError::InvalidNth(arg.to_string())),
        },
    }
}

fn is_name_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == '_' || ch == '-' || !ch.is_ascii()
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || !ch.is_ascii()
}
