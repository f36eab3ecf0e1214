//! End-to-end runs through the real toolchains. A language whose toolchain
//! is not installed is skipped.

mod common;

use common::*;

use kodo_engine::{ExecutionRequest, Scheduler};
use kodo_protocol::common::{ExecutionStatus, Mode, TestCase};
use kodo_sandbox::IsolatorConfig;

use std::env;
use std::path::Path;

use tracing::warn;

fn installed(bin: &str) -> bool {
    match env::var_os("PATH") {
        Some(paths) => env::split_paths(&paths).any(|dir| dir.join(bin).is_file()),
        None => false,
    }
}

fn scheduler(root: &Path) -> Scheduler {
    let mut config = config(root);
    config.executor.isolator = IsolatorConfig::Rlimit {
        isolate_network: false,
    };
    config.executor.compile_timeout = 60000;
    config.executor.run_timeout = 10000;
    Scheduler::new(config).unwrap()
}

async fn check(lang: &str, bin: &str, code: &str, expected: ExecutionStatus) {
    init();
    if !installed(bin) {
        warn!(lang, bin, "toolchain not found, skipped");
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("ws");
    let scheduler = scheduler(&root);

    let cases = vec![TestCase::new("1 2\n", "3"), TestCase::new("40 2\n", "42\n")];
    let req = ExecutionRequest::new(lang, code).with_cases(Mode::Submit, cases);
    let result = scheduler.execute(req).await;

    assert_eq!(
        result.status,
        Some(expected),
        "lang = {}, errors = {:?}",
        lang,
        result.errors
    );
    assert_eq!(leftovers(&root), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn cpp_with_implicit_includes() {
    let code = "int main() { int a, b; cin >> a >> b; cout << a + b << endl; return 0; }";
    check("cpp", "g++", code, ExecutionStatus::Accepted).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cpp_compile_error() {
    let code = "int main() { return undefined_name; }";
    check("C++", "g++", code, ExecutionStatus::CompilationError).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn cpp_containers_without_includes() {
    let code = r#"
int main() {
    int a, b;
    cin >> a >> b;
    map<int, int> m;
    set<int> s;
    queue<int> q;
    unordered_map<int, int> um;
    m[a] = b;
    s.insert(a);
    q.push(b);
    um[b] = a;
    long long sum = (long long)m.begin()->first + q.front();
    cout << min<long long>(sum, LLONG_MAX) << endl;
    return 0;
}
"#;
    check("cpp", "g++", code, ExecutionStatus::Accepted).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn c_with_math() {
    let code = r#"
int main(void) {
    int a, b;
    if (scanf("%d %d", &a, &b) != 2) return 1;
    printf("%d\n", (int)floor(a + b));
    return 0;
}
"#;
    check("c", "gcc", code, ExecutionStatus::Accepted).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn python_sum() {
    let code = "a, b = map(int, input().split())\nprint(a + b)\n";
    check("Python", "python3", code, ExecutionStatus::Accepted).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn python_exception_is_a_runtime_error() {
    check("py", "python3", "raise SystemExit(input())", ExecutionStatus::RuntimeError).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn java_bare_main_is_wrapped() {
    let code = r#"
public static void main(String[] args) {
    Scanner in = new Scanner(System.in);
    System.out.println(in.nextInt() + in.nextInt());
}
"#;
    check("java", "javac", code, ExecutionStatus::Accepted).await;
}

#[tokio::test(flavor = "multi_thread")]
async fn java_full_class() {
    let code = r#"
import java.io.*;

public class Main {
    public static void main(String[] args) throws IOException {
        BufferedReader r = new BufferedReader(new InputStreamReader(System.in));
        String[] parts = r.readLine().trim().split(" ");
        System.out.println(Integer.parseInt(parts[0]) + Integer.parseInt(parts[1]));
    }
}
"#;
    check("java", "javac", code, ExecutionStatus::Accepted).await;
}
