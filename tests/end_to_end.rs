//! End-to-end scenarios driven straight through [`clike::run_program`], in-process.
//!
//! Every scenario here supplies its own [`MapSourceLoader`] and reads output back out of a
//! [`VecSink`] rather than spawning the `clike` binary against a file on disk.

use clike::error::ClikeError;
use clike::loader::MapSourceLoader;
use clike::sink::VecSink;
use clike::trace::NullTrace;

fn run(src: &str) -> Result<Vec<String>, ClikeError> {
    let loader = MapSourceLoader::new();
    let mut sink = VecSink::default();
    let mut trace = NullTrace;
    clike::run_program(src, &loader, "", &mut sink, &mut trace)?;
    Ok(sink.lines)
}

fn run_with_loader(src: &str, loader: &MapSourceLoader) -> Result<Vec<String>, ClikeError> {
    let mut sink = VecSink::default();
    let mut trace = NullTrace;
    clike::run_program(src, loader, "", &mut sink, &mut trace)?;
    Ok(sink.lines)
}

#[test]
fn hello() {
    let output = run(r#"int main() { print("Hello, CLIKE!"); }"#).unwrap();
    assert_eq!(output, vec!["Hello, CLIKE!"]);
}

#[test]
fn factorial() {
    let src = "int factorial(int n){ if (n<=1){return 1;} else {return n*factorial(n-1);} } \
               int main(){ print(factorial(5)); }";
    assert_eq!(run(src).unwrap(), vec!["120"]);
}

#[test]
fn array_sum() {
    let src = "int main(){ int a[3]; a[0]=10; a[1]=20; a[2]=30; int s=0; \
               for(int i=0;i<3;i=i+1){s=s+a[i];} print(s); }";
    assert_eq!(run(src).unwrap(), vec!["60"]);
}

#[test]
fn float_division() {
    assert_eq!(run("int main(){ print(5/2); }").unwrap(), vec!["2.5"]);
}

#[test]
fn include_pulls_in_a_function_from_another_file() {
    let loader = MapSourceLoader::new().with_file("utils.clike", "int add(int a,int b){return a+b;}");
    let src = "#include \"utils.clike\"\nint main(){ print(add(5,3)); }";
    assert_eq!(run_with_loader(src, &loader).unwrap(), vec!["8"]);
}

#[test]
fn bounds_error_cites_the_offending_line() {
    let err = run("int main(){\n int a[2];\n print(a[5]);\n}").unwrap_err();
    match err {
        ClikeError::IndexOutOfBounds { index, len, pos } => {
            assert_eq!((index, len), (5, 2));
            assert_eq!(pos.line, 3);
        }
        other => panic!("expected INDEX_OUT_OF_BOUNDS, got {other:?}"),
    }
}

#[test]
fn type_narrowing_is_rejected_before_any_output() {
    let err = run("int main(){ int x = 1.5; }").unwrap_err();
    assert!(matches!(err, ClikeError::TypeNarrowing { .. }));
}

#[test]
fn recursive_include_is_harmless() {
    let loader = MapSourceLoader::new()
        .with_file("a.clike", "#include \"b.clike\"\nint from_a(){ return 1; }")
        .with_file("b.clike", "#include \"a.clike\"\nint from_b(){ return 2; }");
    let src = "#include \"a.clike\"\nint main(){ print(from_a() + from_b()); }";
    assert_eq!(run_with_loader(src, &loader).unwrap(), vec!["3"]);
}

#[test]
fn missing_main_is_rejected() {
    let err = run("int helper(){ return 1; }").unwrap_err();
    assert!(matches!(err, ClikeError::MissingMain));
}

#[test]
fn rerunning_the_same_program_is_deterministic() {
    let src = "int main(){ print(\"stable\"); }";
    assert_eq!(run(src).unwrap(), run(src).unwrap());
}
