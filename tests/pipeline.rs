use blockc::{
    codegen::{Cell, IMAGE_SIZE},
    error::Severity,
    lex::{lex, Boolop, Keyword, Token},
    pipeline::{compile, Compilation},
    semantic::ScopeId,
    source::Source,
};

const HELLO: &str = include_str!("../demos/hello.txt");
const LOOP: &str = include_str!("../demos/loop.txt");
const SCOPES: &str = include_str!("../demos/scopes.txt");
const ERRORS: &str = include_str!("../demos/errors.txt");

/// Ejecuta una imagen y retorna lo impreso por cada llamada al sistema.
fn run(image: &[u8; IMAGE_SIZE]) -> Vec<String> {
    let mut memory = *image;
    let (mut a, mut x, mut y, mut zero) = (0u8, 0u8, 0u8, false);
    let mut pc = 0usize;
    let mut printed = Vec::new();

    for _ in 0..10_000 {
        let opcode = memory[pc];
        let operand = memory[(pc + 1) % IMAGE_SIZE];

        pc = match opcode {
            0xA9 => {
                a = operand;
                pc + 2
            }

            0xAD => {
                a = memory[operand as usize];
                pc + 3
            }

            0x8D => {
                memory[operand as usize] = a;
                pc + 3
            }

            0x6D => {
                a = a.wrapping_add(memory[operand as usize]);
                pc + 3
            }

            0xA2 => {
                x = operand;
                pc + 2
            }

            0xAE => {
                x = memory[operand as usize];
                pc + 3
            }

            0xA0 => {
                y = operand;
                pc + 2
            }

            0xAC => {
                y = memory[operand as usize];
                pc + 3
            }

            0xEC => {
                zero = memory[operand as usize] == x;
                pc + 3
            }

            0xD0 if !zero => (pc + 2 + operand as usize) % IMAGE_SIZE,
            0xD0 => pc + 2,

            0xFF => {
                match x {
                    1 => printed.push(y.to_string()),
                    _ => printed.push(
                        memory[y as usize..]
                            .iter()
                            .take_while(|&&byte| byte != 0)
                            .map(|&byte| byte as char)
                            .collect(),
                    ),
                }

                pc + 1
            }

            0x00 => return printed,
            other => panic!("unknown opcode {:02X} at {:02X}", other, pc),
        };
    }

    panic!("program did not halt");
}

fn single(text: &str) -> Compilation {
    let mut compilations = compile("<test>", text);
    assert_eq!(compilations.len(), 1);
    compilations.remove(0)
}

fn output_of(compilation: &Compilation) -> Vec<String> {
    assert!(compilation.succeeded(), "{}", compilation.diagnostics);
    run(compilation.image().unwrap().bytes())
}

#[test]
fn hello_demo() {
    let compilation = single(HELLO);
    assert_eq!(output_of(&compilation), vec!["hello world", "7"]);
    assert_eq!(compilation.diagnostics.warning_count(), 0);
}

#[test]
fn loop_demo() {
    let compilation = single(LOOP);
    assert_eq!(
        output_of(&compilation),
        vec!["0", "1", "2", "3", "4", "done"]
    );
}

#[test]
fn scopes_demo() {
    let compilations = compile("scopes.txt", SCOPES);
    assert_eq!(compilations.len(), 2);

    assert_eq!(output_of(&compilations[0]), vec!["inner", "1"]);
    assert_eq!(output_of(&compilations[1]), vec!["yes"]);
}

#[test]
fn errors_demo() {
    let compilations = compile("errors.txt", ERRORS);
    let kinds: Vec<_> = compilations
        .iter()
        .map(|compilation| {
            compilation
                .diagnostics
                .records()
                .into_iter()
                .filter(|record| record.severity == Severity::Error)
                .map(|record| (record.kind, record.value, record.line, record.column))
                .collect::<Vec<_>>()
        })
        .collect();

    assert_eq!(
        kinds,
        vec![
            vec![("TypeMismatch", String::from("a"), 1, 9)],
            vec![("UndeclaredVariable", String::from("x"), 2, 9)],
            vec![("DuplicateVariable", String::from("a"), 3, 13)],
        ]
    );

    assert!(compilations.iter().all(|compilation| compilation.output.is_none()));
}

#[test]
fn missing_eop_is_only_a_warning() {
    let compilation = single("{ int a a = 1 print(a) }");
    let records = compilation.diagnostics.records();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, "MissingEOP");
    assert_eq!(records[0].severity, Severity::Warning);
    assert_eq!(output_of(&compilation), vec!["1"]);
}

#[test]
fn keywords_coalesce() {
    let source = Source::new("<test>", "{ while }$");
    let tokens: Vec<_> = lex(&source)
        .remove(0)
        .tokens
        .into_iter()
        .map(|token| *token.val())
        .collect();

    assert_eq!(
        tokens,
        vec![
            Token::OpenCurly,
            Token::Keyword(Keyword::While),
            Token::CloseCurly,
            Token::Eop
        ]
    );
}

#[test]
fn not_equal_is_one_token() {
    let source = Source::new("<test>", "{ (a != b) }$");
    let lexed = lex(&source).remove(0);

    assert!(lexed.error.is_none());
    assert_eq!(
        lexed
            .tokens
            .iter()
            .filter(|token| *token.val() == Token::Boolop(Boolop::NotEqual))
            .count(),
        1
    );
}

#[test]
fn shadowing_is_legal() {
    assert!(single("{ int a int a }$")
        .diagnostics
        .contains("DuplicateVariable"));

    let compilation = single("{ int a { int a } }$");
    assert!(!compilation.diagnostics.has_errors());
    assert!(compilation.succeeded());
}

#[test]
fn scope_ids_follow_visitation() {
    let compilation = single("{ { { } } { } }$");
    let scopes = &compilation.analysis.as_ref().unwrap().scopes;

    let levels: Vec<_> = (0..4)
        .map(|id| scopes.get(ScopeId(id)).level())
        .collect();

    assert_eq!(levels, vec![0, 1, 2, 1]);
}

#[test]
fn repeated_literals_share_heap() {
    let compilation = single("{ string s s = \"hi\" print(s) s = \"hi\" print(s) }$");
    let output = compilation.output.as_ref().unwrap();

    let address = output.heap.get("hi").unwrap();
    assert_eq!(output.heap.len(), 2);
    assert_eq!(output.heap.bottom(), address as usize);
    assert_eq!(output_of(&compilation), vec!["hi", "hi"]);
}

#[test]
fn print_reads_variable_slot() {
    let compilation = single("{ int a a = 1 print(a) }$");
    let output = compilation.output.as_ref().unwrap();
    let bytes = output.image.bytes();

    let slot = output.statics.address(output.statics.find('a', ScopeId(0)).unwrap());
    assert_eq!(&bytes[10..15], &[0xAC, slot.unwrap(), 0x00, 0xA2, 0x01]);
}

#[test]
fn backpatching_leaves_no_placeholders() {
    let compilation = single(LOOP);
    let output = compilation.output.as_ref().unwrap();

    let placeholders = output
        .listing
        .iter()
        .filter(|cell| !matches!(cell, Cell::Byte(_)))
        .count();

    assert!(placeholders > 0);
    assert!(compilation
        .hex()
        .unwrap()
        .iter()
        .all(|byte| byte.len() == 2 && !byte.starts_with('T') && !byte.starts_with('J')));
}

#[test]
fn lexical_errors_stop_later_programs() {
    let compilations = compile("<test>", "{ print(1) }$ { @ }$ { print(2) }$");

    assert_eq!(compilations.len(), 2);
    assert!(compilations[0].succeeded());
    assert!(compilations[1].diagnostics.contains("InvalidToken"));
    assert!(compilations[1].cst.is_none());
}
