//! Cross-language tests for outline extraction
//!
//! These go through the registry the way the pipeline does, so extension
//! routing, the empty/binary guards and each extractor are covered together.

use std::path::Path;

use crate::outline::{Declaration, DeclarationKind, ExtractorRegistry};

fn outline(path: &str, content: &str) -> Vec<Declaration> {
    ExtractorRegistry::default().extract_outline(Path::new(path), content)
}

fn find<'a>(decls: &'a [Declaration], name: &str) -> &'a Declaration {
    decls
        .iter()
        .find(|d| d.name == name)
        .unwrap_or_else(|| panic!("no declaration {name} in {:?}", names(decls)))
}

fn names(decls: &[Declaration]) -> Vec<&str> {
    decls.iter().map(|d| d.name.as_str()).collect()
}

#[test]
fn test_single_function_per_language() {
    let cases = [
        ("a.py", "def run(x):\n    return x\n"),
        ("a.js", "function run(x) {\n  return x;\n}\n"),
        ("a.ts", "function run(x: number): number {\n  return x;\n}\n"),
        ("a.rs", "fn run(x: u32) -> u32 {\n    x\n}\n"),
        ("a.sol", "function run(uint x) pure returns (uint) {\n    return x;\n}\n"),
    ];
    for (path, content) in cases {
        let decls = outline(path, content);
        assert_eq!(decls.len(), 1, "{path}: {:?}", names(&decls));
        assert_eq!(decls[0].name, "run", "{path}");
        assert_eq!(decls[0].kind, DeclarationKind::Function, "{path}");
        assert_eq!(decls[0].line, 1, "{path}");
        assert!(decls[0].parameters.as_deref().is_some_and(|p| p.contains('x')), "{path}");
    }
}

#[test]
fn test_python_scenarios() {
    let decls = outline("a.py", "def foo(a, b):\n    pass\n");
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].name, "foo");
    assert!(decls[0].parameters.as_deref().unwrap().contains("a, b"));

    let decls = outline(
        "greeter.py",
        "class Greeter:\n    def greet(self):\n        \"\"\"Say hello\"\"\"\n        pass\n",
    );
    assert_eq!(names(&decls), vec!["Greeter", "Greeter.greet"]);
    assert_eq!(decls[0].kind, DeclarationKind::Class);
    assert_eq!(decls[1].kind, DeclarationKind::Method);
    assert!(decls[1].leading_comment.as_deref().unwrap().contains("Say hello"));
}

#[test]
fn test_nested_qualification() {
    let py = outline(
        "n.py",
        "class Outer:\n    class Inner:\n        def method(self):\n            pass\n",
    );
    find(&py, "Outer.Inner.method");

    let js = outline("n.js", "class Box {\n  open(lid) {\n    return lid;\n  }\n}\n");
    assert_eq!(find(&js, "Box.open").kind, DeclarationKind::Method);

    let rs = outline("n.rs", "struct Point;\nimpl Point {\n    pub fn norm(&self) -> f64 { 0.0 }\n}\n");
    assert_eq!(find(&rs, "Point.norm").kind, DeclarationKind::Method);

    let sol = outline("n.sol", "contract Token {\n    function transfer(address to) public {}\n}\n");
    assert_eq!(find(&sol, "Token.transfer").kind, DeclarationKind::Method);
}

#[test]
fn test_javascript_export_scenario() {
    let decls = outline("math.js", "export function add(a, b) { return a + b; }");
    assert_eq!(decls.len(), 1);
    assert_eq!(decls[0].name, "add");
    assert!(decls[0].is_exported);
    assert!(!decls[0].is_default_export);
}

#[test]
fn test_rust_impl_scenario() {
    let decls = outline("foo.rs", "impl Foo { pub fn bar() {} fn new() -> Self { .. } }");
    assert_eq!(names(&decls), vec!["Foo.bar"]);
}

#[test]
fn test_noise_filters() {
    let py = outline(
        "t.py",
        "class T:\n    def setUp(self):\n        pass\n    def tearDown(self):\n        pass\n    def _helper(self):\n        pass\n    def test_it(self):\n        pass\n",
    );
    assert_eq!(names(&py), vec!["T", "T.test_it"]);

    let rs = outline("t.rs", "impl A { fn new() -> Self { A } }\nimpl B { pub fn new() -> B { B } fn go(&self) {} }\n");
    assert_eq!(names(&rs), vec!["B.go"]);

    let js = outline("t.js", "const useState = (x) => x;\nconst real = (x) => x;\n");
    assert_eq!(names(&js), vec!["real"]);
}

#[test]
fn test_malformed_input() {
    let py = outline("bad.py", "def ok():\n    pass\n\nclass Broken:\n    def method(self\n");
    find(&py, "ok");

    let rs = outline("bad.rs", "fn ok() {}\nfn unclosed() {\n    let x = {\n");
    find(&rs, "ok");

    let js = outline("bad.js", "function ok() {}\nclass {{{ ((( ]]] '");
    find(&js, "ok");

    let sol = outline("bad.sol", "contract C { function f(");
    find(&sol, "C");
}

#[test]
fn test_empty_binary_and_unknown() {
    assert!(outline("empty.py", "").is_empty());
    assert!(outline("blank.rs", "   \n\n").is_empty());
    assert!(outline("blob.js", "function a() {}\0\0").is_empty());
    assert!(outline("notes.txt", "def foo(): pass").is_empty());
}

#[test]
fn test_idempotent_extraction() {
    let sources = [
        ("a.py", "class A:\n    def f(self, x):\n        pass\n"),
        ("a.ts", "export class A {\n  f(x: number) {}\n}\nexport const g = () => 1;\n"),
        ("a.rs", "/// Doc\npub struct A;\nimpl A { pub fn f(&self) {} }\n"),
        ("a.sol", "contract A { function f() public {} }\n"),
    ];
    for (path, content) in sources {
        assert_eq!(outline(path, content), outline(path, content), "{path}");
    }
}

#[test]
fn test_typescript_class_and_exports() {
    let content = r#"
// User interface
interface User {
    name: string;
    age: number;
}

/**
 * A service for managing users
 */
export class UserService {
    private users: User[] = [];

    /**
     * Add a new user
     */
    addUser(user: User): void {
        this.users.push(user);
    }

    getUsers(): User[] {
        return this.users;
    }
}

// Utility function
export function formatUser(user: User): string {
    return `${user.name} (${user.age})`;
}

// Default export arrow function
const processUser = (user: User): void => {
    console.log(formatUser(user));
};
export default processUser;
"#;
    let decls = outline("users.ts", content);
    assert_eq!(decls.len(), 5, "{:?}", names(&decls));

    let service = find(&decls, "UserService");
    assert!(service.line > 0);
    assert!(service.leading_comment.as_deref().unwrap().contains("service for managing users"));
    assert!(service.is_exported);
    assert!(!service.is_default_export);

    let add_user = find(&decls, "UserService.addUser");
    assert!(add_user.parameters.as_deref().unwrap().contains("user: User"));
    assert!(add_user.leading_comment.as_deref().unwrap().contains("Add a new user"));
    assert!(!add_user.is_exported);

    find(&decls, "UserService.getUsers");

    let format_user = find(&decls, "formatUser");
    assert!(format_user.parameters.as_deref().unwrap().contains("user: User"));
    assert!(format_user.is_exported);
    assert!(!format_user.is_default_export);

    let process_user = find(&decls, "processUser");
    assert!(process_user.parameters.as_deref().unwrap().contains("user: User"));
    assert!(process_user.is_exported);
    assert!(process_user.is_default_export);
}

#[test]
fn test_javascript_class_with_constructor() {
    let content = r#"
/**
 * User service for managing application users
 */
class UserService {
    constructor(config) {
        this.config = config;
    }

    /**
     * Add a new user to the system
     */
    addUser(user) {
        // Implementation
    }
}

// Utility function
function formatUser(user) {
    return `${user.name}`;
}

// Arrow function
const processUser = user => {
    console.log(formatUser(user));
};
"#;
    let decls = outline("users.js", content);
    assert_eq!(decls.len(), 5, "{:?}", names(&decls));

    let service = find(&decls, "UserService");
    assert!(service.leading_comment.as_deref().unwrap().contains("User service for managing"));

    let constructor = find(&decls, "constructor");
    assert!(constructor.parameters.as_deref().unwrap().contains("config"));

    let add_user = find(&decls, "UserService.addUser");
    assert!(add_user.leading_comment.as_deref().unwrap().contains("Add a new user"));

    assert_eq!(find(&decls, "formatUser").parameters.as_deref(), Some("user"));
    assert_eq!(find(&decls, "processUser").parameters.as_deref(), Some("user"));
}

#[test]
fn test_tsx_components() {
    let content = r#"
interface Props {
    name: string;
}

/**
 * A simple greeting component
 */
function Greeting({ name }: Props) {
    return <h1>Hello, {name}!</h1>;
}

// Container component
const GreetingContainer: React.FC = () => {
    return <Greeting name="World" />;
};
"#;
    let decls = outline("greeting.tsx", content);
    assert_eq!(names(&decls), vec!["Greeting", "GreetingContainer"]);

    let greeting = find(&decls, "Greeting");
    assert!(greeting.parameters.as_deref().unwrap().contains("name"));
    assert!(greeting.leading_comment.as_deref().unwrap().contains("greeting component"));
}

#[test]
fn test_typescript_decorators() {
    let content = r#"
import { Controller, Get } from '@nestjs/common';

@Controller('users')
export class UsersController {
    /**
     * Get all users
     */
    @Get()
    getAllUsers() {
        return [];
    }

    @Get(':id')
    getUserById(@Param('id') id: string) {
        return { id };
    }
}
"#;
    let decls = outline("users.controller.ts", content);
    assert_eq!(
        names(&decls),
        vec!["UsersController", "UsersController.getAllUsers", "UsersController.getUserById"]
    );

    let controller = find(&decls, "UsersController");
    assert!(controller.is_exported);
    assert!(!controller.is_default_export);
    assert_eq!(
        find(&decls, "UsersController.getAllUsers").leading_comment.as_deref(),
        Some("Get all users")
    );
    assert!(find(&decls, "UsersController.getUserById")
        .parameters
        .as_deref()
        .unwrap()
        .contains("id: string"));
}

#[test]
fn test_declaration_order_follows_source() {
    let decls = outline(
        "order.rs",
        "pub trait Shape {\n    fn area(&self) -> f64;\n}\npub enum Kind { A, B }\npub fn build() {}\n",
    );
    assert_eq!(names(&decls), vec!["Shape", "Shape.area", "Kind", "build"]);
    let lines: Vec<usize> = decls.iter().map(|d| d.line).collect();
    assert_eq!(lines, vec![1, 2, 4, 5]);
}

#[test]
fn test_parameter_scan_is_bounded() {
    let wide = (0..600).map(|i| format!("a{i}: u8")).collect::<Vec<_>>().join(", ");
    assert!(wide.len() > crate::outline::common::MAX_PARAM_SPAN);

    let rs = outline("wide.rs", &format!("pub fn wide({wide}) {{}}\npub fn narrow(x: u8) {{}}\n"));
    assert_eq!(names(&rs), vec!["wide", "narrow"]);
    assert_eq!(rs[0].parameters, None);
    assert_eq!(rs[1].parameters.as_deref(), Some("x: u8"));

    let js = outline("wide.js", &format!("function wide({wide}) {{}}\nfunction narrow(x) {{}}\n"));
    assert_eq!(names(&js), vec!["wide", "narrow"]);
    assert_eq!(js[0].parameters, None);
}
