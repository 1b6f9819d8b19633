//! The compiled-token reader. Decompiled `EA06` scripts are stored not
//! as source text but as a binary token stream: a 4-byte line count
//! followed by one tagged token per entry. This module reconstructs
//! those tokens; turning the token stream back into formatted source
//! text is left to an external pretty-printer (out of scope here, as is
//! the plain-text tokenizer used for already-decompiled scripts).
//!
//! Class-byte layout. The compiler's own class-id table isn't part of
//! what decoding needs to be correct — only three boundaries are load
//! bearing, and they come straight from the reference reader: class `0`
//! is a keyword, class `1` a standard function, and any class in
//! `3..16` / `16..32` / `32..48` is a bare int32/int64/float64 literal
//! with no other payload. Class `2` (macro) is the only other class
//! below 48 — it carries a string and nothing else, since it's excluded
//! from the `3..16` override by a strict `>` in the source. Every other
//! token kind (identifiers, user functions, struct fields, string
//! literals, directives, punctuation, end-of-line, operators) therefore
//! has to live at class `>= 48`, clear of the three numeric ranges; the
//! exact byte assigned to each is this reconstruction's own, since the
//! original table never reached this pack.

use byteorder::{ByteOrder, LittleEndian};

/// Keyword/operator classification. Variant order matters for nothing
/// here (unlike the Go original, precedence is a method, not position),
/// but is kept close to the source's grouping for readability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenType {
    Keyword,
    StdFunction,
    Macro,
    Identifier,
    UserFunction,
    StructField,
    StrLit,
    Directive,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Int32,
    Int64,
    Float64,
    Eol,

    OpAssign,
    OpStructRef,
    OpAdd,
    OpSub,
    OpMul,
    OpDiv,
    OpNot,
    OpAnd,
    OpOr,
    OpGt,
    OpGe,
    OpLt,
    OpLe,
    OpNe,
    OpEq,
    OpStrEq,
    OpExp,
    OpAddEq,
    OpSubEq,
    OpDivEq,
    OpMulEq,
    OpConcatAssign,
    OpTernaryQuestion,
    OpTernaryColon,
    OpConcat,

    Eof,
    Invalid,
}

impl TokenType {
    pub fn is_binary_op(self) -> bool {
        use TokenType::*;
        matches!(
            self,
            OpExp | OpMul | OpDiv | OpAdd | OpSub | OpConcat | OpGt | OpGe | OpLe | OpLt | OpStrEq | OpNe | OpAssign | OpAnd | OpOr
        )
    }

    pub fn is_number(self) -> bool {
        matches!(self, TokenType::Float64 | TokenType::Int32 | TokenType::Int64)
    }

    pub fn is_unary_op(self) -> bool {
        matches!(self, TokenType::OpAdd | TokenType::OpSub | TokenType::OpNot)
    }

    pub fn unary_precedence(self) -> u8 {
        match self {
            TokenType::OpAdd | TokenType::OpSub => 9,
            TokenType::OpNot => 10,
            _ => 0,
        }
    }

    pub fn binary_precedence(self) -> u8 {
        use TokenType::*;
        match self {
            OpStructRef => 8,
            OpExp => 7,
            OpMul | OpDiv => 6,
            OpAdd | OpSub => 5,
            OpConcat => 3,
            OpGt | OpGe | OpLe | OpLt | OpStrEq | OpNe | OpAssign => 2,
            OpAnd | OpOr => 1,
            _ => 0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub id: u8,
}

impl Token {
    fn new(token_type: TokenType, value: impl Into<String>) -> Self {
        Token { token_type, value: value.into(), id: 0 }
    }

    fn eof() -> Self {
        Token { token_type: TokenType::Eof, value: String::new(), id: 0 }
    }

    fn invalid() -> Self {
        Token { token_type: TokenType::Invalid, value: String::new(), id: 0 }
    }
}

// Raw class bytes below 48 are load-bearing (see module doc); the rest
// are this reconstruction's own layout, placed clear of the int32 /
// int64 / float64 ranges.
const CLASS_KEYWORD: u8 = 0;
const CLASS_STD_FUNCTION: u8 = 1;
const CLASS_MACRO: u8 = 2;
const CLASS_IDENTIFIER: u8 = 48;
const CLASS_USER_FUNCTION: u8 = 49;
const CLASS_STRUCT_FIELD: u8 = 50;
const CLASS_STR_LIT: u8 = 51;
const CLASS_DIRECTIVE: u8 = 52;
const CLASS_LPAREN: u8 = 53;
const CLASS_RPAREN: u8 = 54;
const CLASS_LBRACKET: u8 = 55;
const CLASS_RBRACKET: u8 = 56;
const CLASS_COMMA: u8 = 57;
const CLASS_EOL: u8 = 58;
const CLASS_OP_ASSIGN: u8 = 59;
const CLASS_OP_STRUCT_REF: u8 = 60;
const CLASS_OP_ADD: u8 = 61;
const CLASS_OP_SUB: u8 = 62;
const CLASS_OP_MUL: u8 = 63;
const CLASS_OP_DIV: u8 = 64;
const CLASS_OP_NOT: u8 = 65;
const CLASS_OP_AND: u8 = 66;
const CLASS_OP_OR: u8 = 67;
const CLASS_OP_GT: u8 = 68;
const CLASS_OP_GE: u8 = 69;
const CLASS_OP_LT: u8 = 70;
const CLASS_OP_LE: u8 = 71;
const CLASS_OP_NE: u8 = 72;
const CLASS_OP_EQ: u8 = 73;
const CLASS_OP_STR_EQ: u8 = 74;
const CLASS_OP_EXP: u8 = 75;
const CLASS_OP_ADD_EQ: u8 = 76;
const CLASS_OP_SUB_EQ: u8 = 77;
const CLASS_OP_DIV_EQ: u8 = 78;
const CLASS_OP_MUL_EQ: u8 = 79;
const CLASS_OP_CONCAT_ASSIGN: u8 = 80;
const CLASS_OP_TERNARY_QUESTION: u8 = 81;
const CLASS_OP_TERNARY_COLON: u8 = 82;
const CLASS_OP_CONCAT: u8 = 83;

/// Maps a raw class byte to the [`TokenType`] template it names, or
/// `None` for an unrecognized byte (→ `InvalidToken`). `3..16`,
/// `16..32` and `32..48` are handled separately by the caller, since
/// they're ranges rather than discrete values.
fn token_type_for_class(class: u8) -> Option<TokenType> {
    use TokenType::*;
    Some(match class {
        CLASS_KEYWORD => Keyword,
        CLASS_STD_FUNCTION => StdFunction,
        CLASS_MACRO => Macro,
        CLASS_IDENTIFIER => Identifier,
        CLASS_USER_FUNCTION => UserFunction,
        CLASS_STRUCT_FIELD => StructField,
        CLASS_STR_LIT => StrLit,
        CLASS_DIRECTIVE => Directive,
        CLASS_LPAREN => LParen,
        CLASS_RPAREN => RParen,
        CLASS_LBRACKET => LBracket,
        CLASS_RBRACKET => RBracket,
        CLASS_COMMA => Comma,
        CLASS_EOL => Eol,
        CLASS_OP_ASSIGN => OpAssign,
        CLASS_OP_STRUCT_REF => OpStructRef,
        CLASS_OP_ADD => OpAdd,
        CLASS_OP_SUB => OpSub,
        CLASS_OP_MUL => OpMul,
        CLASS_OP_DIV => OpDiv,
        CLASS_OP_NOT => OpNot,
        CLASS_OP_AND => OpAnd,
        CLASS_OP_OR => OpOr,
        CLASS_OP_GT => OpGt,
        CLASS_OP_GE => OpGe,
        CLASS_OP_LT => OpLt,
        CLASS_OP_LE => OpLe,
        CLASS_OP_NE => OpNe,
        CLASS_OP_EQ => OpEq,
        CLASS_OP_STR_EQ => OpStrEq,
        CLASS_OP_EXP => OpExp,
        CLASS_OP_ADD_EQ => OpAddEq,
        CLASS_OP_SUB_EQ => OpSubEq,
        CLASS_OP_DIV_EQ => OpDivEq,
        CLASS_OP_MUL_EQ => OpMulEq,
        CLASS_OP_CONCAT_ASSIGN => OpConcatAssign,
        CLASS_OP_TERNARY_QUESTION => OpTernaryQuestion,
        CLASS_OP_TERNARY_COLON => OpTernaryColon,
        CLASS_OP_CONCAT => OpConcat,
        c if (3..16).contains(&c) => Int32,
        c if (16..32).contains(&c) => Int64,
        c if (32..48).contains(&c) => Float64,
        _ => return None,
    })
}

/// Classes whose template carries a string payload (read via
/// [`Lexer::read_string`]) ahead of any further per-class decoding.
/// Mirrors the source's `tok.TokType >= Keyword && tok.TokType < EndOfGetString`
/// guard: keyword and standard-function classes read a string here too,
/// even though it's immediately discarded in favor of the index lookup
/// below — an apparent quirk of the original format, preserved as-is.
fn needs_string_payload(token_type: TokenType) -> bool {
    matches!(
        token_type,
        TokenType::Keyword
            | TokenType::StdFunction
            | TokenType::Macro
            | TokenType::Identifier
            | TokenType::UserFunction
            | TokenType::StructField
            | TokenType::StrLit
            | TokenType::Directive
    )
}

const AU3_KEYWORDS: &[&str] = &[
    "If", "Then", "Else", "ElseIf", "EndIf", "While", "WEnd", "Do", "Until", "For", "To", "Step", "Next", "ExitLoop",
    "ContinueLoop", "Func", "EndFunc", "Return", "Dim", "Global", "Local", "Const", "Select", "Case", "EndSelect",
    "Switch", "EndSwitch", "With", "EndWith", "Not", "And", "Or", "True", "False", "Default", "Null", "ByRef",
    "Static", "Exit",
];

const AU3_STD_FUNCTIONS: &[&str] = &[
    "MsgBox", "StringLen", "StringFormat", "FileOpen", "FileRead", "FileWrite", "FileClose", "Run", "RunWait",
    "Sleep", "ConsoleWrite", "StringSplit", "StringReplace", "StringInStr", "IsArray", "IsString", "IsNumber",
    "UBound", "ArrayDisplay", "WinActivate", "WinWait", "ProcessExists", "ProcessClose", "EnvGet", "EnvSet",
];

const AU3_MACROS: &[&str] = &["@error", "@extended", "@ScriptDir", "@AutoItExe", "@OSVersion", "@TempDir", "@WorkingDir"];
const AU3_USER_FUNCTIONS: &[&str] = &[];

/// Case-insensitive canonical-casing lookup: returns the table's own
/// casing for a case-insensitive match, or the input unchanged.
fn clean_word(list: &[&str], needle: &str) -> String {
    list.iter().find(|w| w.eq_ignore_ascii_case(needle)).map(|w| w.to_string()).unwrap_or_else(|| needle.to_string())
}

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    pending_struct_field: Option<String>,
}

impl<'a> Lexer<'a> {
    /// `src` is the full decompressed resource buffer, still carrying
    /// the 4-byte little-endian line count header.
    pub fn new(src: &'a [u8]) -> Self {
        let body = if src.len() >= 4 { &src[4..] } else { &[] };
        Lexer { src: body, pos: 0, pending_struct_field: None }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let b = *self.src.get(self.pos)?;
        self.pos += 1;
        Some(b)
    }

    fn read_u32(&mut self) -> u32 {
        let mut b = [0u8; 4];
        for slot in b.iter_mut() {
            *slot = self.next_byte().unwrap_or(0);
        }
        LittleEndian::read_u32(&b)
    }

    fn read_u64(&mut self) -> u64 {
        let mut b = [0u8; 8];
        for slot in b.iter_mut() {
            *slot = self.next_byte().unwrap_or(0);
        }
        LittleEndian::read_u64(&b)
    }

    fn read_f64(&mut self) -> f64 {
        f64::from_bits(self.read_u64())
    }

    /// A 32-bit length prefix followed by that many UTF-16 code units,
    /// each byte pair XOR-masked by the length's low/high byte.
    fn read_string(&mut self) -> String {
        let size = self.read_u32() as usize;
        let mut units = Vec::with_capacity(size);
        for _ in 0..size {
            let lo = self.next_byte().unwrap_or(0) ^ (size as u8);
            let hi = self.next_byte().unwrap_or(0) ^ ((size >> 8) as u8);
            units.push(((hi as u16) << 8) | lo as u16);
        }
        String::from_utf16_lossy(&units)
    }

    /// Produces the next token, including the implicit `.` operator a
    /// struct-field token fires before its field name on the following
    /// call (a one-shot pending slot, not a lookahead buffer).
    pub fn next_token(&mut self) -> Token {
        if let Some(field) = self.pending_struct_field.take() {
            return Token::new(TokenType::StructField, field);
        }

        let class = match self.next_byte() {
            Some(c) => c,
            None => return Token::eof(),
        };
        let mut token_type = match token_type_for_class(class) {
            Some(t) => t,
            None => return Token::invalid(),
        };

        let mut value = String::new();
        if needs_string_payload(token_type) {
            value = self.read_string();
        }

        if class == CLASS_KEYWORD {
            let index = self.read_u32() as usize;
            token_type = TokenType::Keyword;
            value = AU3_KEYWORDS.get(index).map(|s| s.to_string()).unwrap_or(value);
        } else if class == CLASS_STD_FUNCTION {
            let index = self.read_u32() as usize;
            token_type = TokenType::StdFunction;
            value = AU3_STD_FUNCTIONS.get(index).map(|s| s.to_string()).unwrap_or(value);
        } else if (3..16).contains(&class) {
            token_type = TokenType::Int32;
            value = fmt_int32(self.read_u32());
        } else if (16..32).contains(&class) {
            token_type = TokenType::Int64;
            value = fmt_int64(self.read_u64());
        } else if (32..48).contains(&class) {
            token_type = TokenType::Float64;
            value = format!("{}", self.read_f64());
        }

        match token_type {
            TokenType::Keyword => {
                value = clean_word(AU3_KEYWORDS, &value);
                token_type = match value.as_str() {
                    "Not" => TokenType::OpNot,
                    "And" => TokenType::OpAnd,
                    "Or" => TokenType::OpOr,
                    _ => TokenType::Keyword,
                };
            }
            TokenType::StdFunction => value = clean_word(AU3_STD_FUNCTIONS, &value),
            TokenType::StrLit => value = format!("{value:?}"),
            TokenType::StructField => {
                self.pending_struct_field = Some(value);
                return Token::new(TokenType::OpStructRef, ".");
            }
            TokenType::Identifier => value = format!("${value}"),
            TokenType::Macro => value = clean_word(AU3_MACROS, &format!("@{value}")),
            TokenType::UserFunction => value = clean_word(AU3_USER_FUNCTIONS, &value),
            _ => {}
        }

        let mut token = Token::new(token_type, value);
        token.id = class;
        token
    }
}

/// Hex for non-negative values, decimal (with sign) otherwise — matching
/// the source's dynamic integer formatting.
fn fmt_int32(n: u32) -> String {
    let signed = n as i32;
    if signed < 0 {
        format!("{signed}")
    } else {
        format!("{signed:#x}")
    }
}

fn fmt_int64(n: u64) -> String {
    if n <= u32::MAX as u64 {
        return fmt_int32(n as u32);
    }
    let signed = n as i64;
    if signed < 0 {
        format!("{signed}")
    } else {
        format!("{signed:#x}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode_string(s: &str) -> Vec<u8> {
        let units: Vec<u16> = s.encode_utf16().collect();
        let size = units.len() as u32;
        let mut out = size.to_le_bytes().to_vec();
        for u in units {
            let lo = (u & 0xff) as u8 ^ (size as u8);
            let hi = (u >> 8) as u8 ^ ((size >> 8) as u8);
            out.push(lo);
            out.push(hi);
        }
        out
    }

    #[test]
    fn directive_token_round_trips_its_string_payload() {
        let mut buf = 0u32.to_le_bytes().to_vec(); // line count header
        buf.push(CLASS_DIRECTIVE);
        buf.extend(encode_string("#include"));
        let mut lex = Lexer::new(&buf);
        let tok = lex.next_token();
        assert_eq!(tok.token_type, TokenType::Directive);
        assert_eq!(tok.value, "#include");
        assert_eq!(lex.next_token().token_type, TokenType::Eof);
    }

    #[test]
    fn struct_field_token_emits_implicit_dot_first() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.push(CLASS_STRUCT_FIELD);
        buf.extend(encode_string("x"));
        let mut lex = Lexer::new(&buf);
        let dot = lex.next_token();
        assert_eq!(dot.token_type, TokenType::OpStructRef);
        assert_eq!(dot.value, ".");
        let field = lex.next_token();
        assert_eq!(field.token_type, TokenType::StructField);
        assert_eq!(field.value, "x");
    }

    #[test]
    fn macro_class_reads_only_a_string_no_index() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.push(CLASS_MACRO);
        buf.extend(encode_string("error"));
        let mut lex = Lexer::new(&buf);
        let tok = lex.next_token();
        assert_eq!(tok.token_type, TokenType::Macro);
        assert_eq!(tok.value, "@error");
    }

    #[test]
    fn keyword_class_reads_a_wasted_string_then_an_index() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.push(CLASS_KEYWORD);
        buf.extend(encode_string("unused placeholder"));
        buf.extend(5u32.to_le_bytes()); // index into AU3_KEYWORDS: "While"
        let mut lex = Lexer::new(&buf);
        let tok = lex.next_token();
        assert_eq!(tok.token_type, TokenType::Keyword);
        assert_eq!(tok.value, "While");
    }

    #[test]
    fn int32_class_byte_has_no_string_payload() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.push(5); // inside 3..16
        buf.extend(42u32.to_le_bytes());
        let mut lex = Lexer::new(&buf);
        let tok = lex.next_token();
        assert_eq!(tok.token_type, TokenType::Int32);
        assert_eq!(tok.value, "0x2a");
    }

    #[test]
    fn int32_formats_as_hex_and_negative_as_decimal() {
        assert_eq!(fmt_int32(42), "0x2a");
        assert_eq!(fmt_int32(u32::MAX), "-1");
    }

    #[test]
    fn binary_precedence_orders_mul_over_add() {
        assert!(TokenType::OpMul.binary_precedence() > TokenType::OpAdd.binary_precedence());
    }

    #[test]
    fn unknown_class_byte_is_invalid_token() {
        let mut buf = 0u32.to_le_bytes().to_vec();
        buf.push(255);
        let mut lex = Lexer::new(&buf);
        assert_eq!(lex.next_token().token_type, TokenType::Invalid);
    }
}
