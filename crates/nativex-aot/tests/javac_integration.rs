//! Compile gate tests against a real `javac`; skipped when no JDK is installed

use std::path::{Path, PathBuf};
use std::process::Command;

use nativex_aot::compiler::discover_sources;
use nativex_aot::writer::write_sources;
use nativex_aot::{CompileError, GenerationContext, Generator, Javac, ResolvedGraph, SourceCompiler};
use tempfile::TempDir;

/// Minimal stand-ins for the container types the initializer compiles against.
const CONTAINER_STUBS: &[(&str, &str)] = &[
    (
        "org/springframework/context/ApplicationContextInitializer.java",
        r#"package org.springframework.context;

public interface ApplicationContextInitializer<C> {
	void initialize(C applicationContext);
}
"#,
    ),
    (
        "org/springframework/beans/factory/config/ConfigurableListableBeanFactory.java",
        r#"package org.springframework.beans.factory.config;

public interface ConfigurableListableBeanFactory {
	void registerSingleton(String beanName, Object singletonObject);

	Object getSingleton(String beanName);
}
"#,
    ),
    (
        "org/springframework/context/support/GenericApplicationContext.java",
        r#"package org.springframework.context.support;

import java.util.HashMap;
import java.util.Map;
import org.springframework.beans.factory.config.ConfigurableListableBeanFactory;

public class GenericApplicationContext {
	private final Map<String, Object> singletons = new HashMap<>();

	public ConfigurableListableBeanFactory getBeanFactory() {
		return new ConfigurableListableBeanFactory() {
			public void registerSingleton(String beanName, Object singletonObject) {
				singletons.put(beanName, singletonObject);
			}

			public Object getSingleton(String beanName) {
				return singletons.get(beanName);
			}
		};
	}
}
"#,
    ),
    (
        "nativex/launch/Launcher.java",
        r#"package nativex.launch;

import org.springframework.context.ApplicationContextInitializer;
import org.springframework.context.support.GenericApplicationContext;

public class Launcher {
	@SuppressWarnings("unchecked")
	public static void main(String[] args) throws Exception {
		GenericApplicationContext context = new GenericApplicationContext();
		Object initializer = Class.forName(args[0]).getDeclaredConstructor().newInstance();
		((ApplicationContextInitializer<GenericApplicationContext>) initializer).initialize(context);
		for (int i = 1; i < args.length; i++) {
			System.out.println(args[i] + "=" + context.getBeanFactory().getSingleton(args[i]));
		}
	}
}
"#,
    ),
];

fn javac() -> Option<Javac> {
    let javac = Javac::default();
    if javac.is_available() {
        Some(javac)
    } else {
        eprintln!("javac not found, skipping");
        None
    }
}

fn write_source(root: &Path, relative: &str, body: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, body).unwrap();
    path
}

/// Generate the units for `graph` next to the container stubs and
/// `application` sources, then compile everything in one invocation.
fn generate_and_compile(
    javac: Javac,
    root: &Path,
    graph: &str,
    application: &[(&str, &str)],
) -> PathBuf {
    let sources = root.join("sources");
    for (relative, body) in CONTAINER_STUBS.iter().chain(application) {
        write_source(&sources, relative, body);
    }
    let graph = ResolvedGraph::parse(graph).unwrap();
    let units = Generator::new()
        .generate(&graph, &mut GenerationContext::new())
        .unwrap();
    write_sources(&units, &sources).unwrap();

    let classes = root.join("classes");
    let all = discover_sources(&sources).unwrap();
    let diagnostics = SourceCompiler::new(javac).compile(&all, &classes).unwrap();
    assert!(!diagnostics.has_errors());
    classes
}

/// Run the initializer through the launcher and print the named beans, or
/// `None` when no `java` launcher is installed.
fn launch(classes: &Path, initializer: &str, beans: &[&str]) -> Option<String> {
    let available = Command::new("java")
        .arg("-version")
        .output()
        .is_ok_and(|output| output.status.success());
    if !available {
        eprintln!("java not found, skipping launch");
        return None;
    }
    let output = Command::new("java")
        .arg("-cp")
        .arg(classes)
        .arg("nativex.launch.Launcher")
        .arg(initializer)
        .args(beans)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "launch failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    Some(String::from_utf8_lossy(&output.stdout).into_owned())
}

#[test]
fn test_valid_source_compiles() {
    let Some(javac) = javac() else { return };
    let temp = TempDir::new().unwrap();
    let source = write_source(
        temp.path(),
        "sources/com/example/Greeter.java",
        "package com.example;\n\npublic class Greeter {\n\tpublic String greet() {\n\t\treturn \"hello\";\n\t}\n}\n",
    );
    let classes = temp.path().join("classes");

    let diagnostics = SourceCompiler::new(javac)
        .compile(&[source], &classes)
        .unwrap();
    assert!(!diagnostics.has_errors());
    assert!(classes.join("com/example/Greeter.class").is_file());
}

#[test]
fn test_syntax_error_reports_file_and_line() {
    let Some(javac) = javac() else { return };
    let temp = TempDir::new().unwrap();
    let source = write_source(
        temp.path(),
        "sources/com/example/Broken.java",
        "package com.example;\n\npublic class Broken {\n\tint value = 1\n}\n",
    );

    let err = SourceCompiler::new(javac)
        .compile(&[source.clone()], &temp.path().join("classes"))
        .unwrap_err();
    match err {
        CompileError::Failed {
            report,
            diagnostics,
        } => {
            let error = diagnostics.errors().next().unwrap();
            assert_eq!(error.line, Some(4));
            assert!(error.column.is_some());
            assert!(error
                .source
                .as_ref()
                .is_some_and(|path| path.ends_with("com/example/Broken.java")));
            assert!(report.contains("Broken.java 4:"));
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_generated_sample_initializer_compiles_and_runs() {
    let Some(javac) = javac() else { return };
    let temp = TempDir::new().unwrap();
    let classes = generate_and_compile(
        javac,
        temp.path(),
        r#"
application = "com.example.nativex.sample.basic.BasicApplication"

[[steps]]
kind = "literal"
bean = "message"
value = "hello"

[[steps]]
kind = "instance"
bean = "sampleBean"
type = "com.example.nativex.sample.basic.SampleBean"
args = [{ ref = "message" }]

[[steps]]
kind = "lifecycle"
bean = "sampleBean"
method = "printMessageOnStartup"
"#,
        &[
            (
                "com/example/nativex/sample/basic/BasicApplication.java",
                "package com.example.nativex.sample.basic;\n\npublic class BasicApplication {\n}\n",
            ),
            (
                "com/example/nativex/sample/basic/SampleBean.java",
                r#"package com.example.nativex.sample.basic;

public class SampleBean {
	private final String message;

	public SampleBean(String message) {
		this.message = message;
	}

	public void printMessageOnStartup() {
		System.out.println(message);
	}
}
"#,
            ),
        ],
    );
    assert!(classes
        .join("com/example/nativex/sample/basic/BasicApplication__ApplicationContextInitializer.class")
        .is_file());

    let Some(stdout) = launch(
        &classes,
        "com.example.nativex.sample.basic.BasicApplication__ApplicationContextInitializer",
        &["message"],
    ) else {
        return;
    };
    assert_eq!(stdout, "hello\nmessage=hello\n");
}

#[test]
fn test_generated_reflective_access_reaches_private_members() {
    let Some(javac) = javac() else { return };
    let temp = TempDir::new().unwrap();
    let classes = generate_and_compile(
        javac,
        temp.path(),
        r#"
application = "com.example.App"

[[steps]]
kind = "literal"
bean = "capacity"
value = 16

[[steps]]
kind = "instance"
bean = "store"
type = "com.example.MemoryStore"

[[steps]]
kind = "instance"
bean = "service"
type = "com.example.Service"
args = [{ value = 4 }]
visibility = "private"

[[steps]]
kind = "property"
bean = "service"
name = "store"
value = { ref = "store" }
parameter-type = "com.example.Store"
visibility = "private"

[[steps]]
kind = "property"
bean = "service"
name = "capacity"
value = { ref = "capacity" }
parameter-type = "int"
visibility = "private"

[[steps]]
kind = "property"
bean = "service"
name = "label"
value = { value = "primary" }
injection = "field"
visibility = "private"

[[steps]]
kind = "lifecycle"
bean = "service"
method = "init"
visibility = "private"
"#,
        &[
            ("com/example/App.java", "package com.example;\n\npublic class App {\n}\n"),
            (
                "com/example/Store.java",
                "package com.example;\n\npublic interface Store {\n\tString name();\n}\n",
            ),
            (
                "com/example/MemoryStore.java",
                r#"package com.example;

public class MemoryStore implements Store {
	public String name() {
		return "memory";
	}
}
"#,
            ),
            (
                "com/example/Service.java",
                r#"package com.example;

public class Service {
	private final int workers;
	private Store store;
	private int capacity;
	private String label;
	private boolean ready;

	private Service(int workers) {
		this.workers = workers;
	}

	private void setStore(Store store) {
		this.store = store;
	}

	private void setCapacity(int capacity) {
		this.capacity = capacity;
	}

	private void init() {
		ready = true;
	}

	@Override
	public String toString() {
		return workers + ":" + store.name() + ":" + capacity + ":" + label + ":" + ready;
	}
}
"#,
            ),
        ],
    );
    assert!(classes.join("com/example/App__ReflectiveAccess.class").is_file());

    let Some(stdout) = launch(&classes, "com.example.App__ApplicationContextInitializer", &["service"])
    else {
        return;
    };
    assert_eq!(stdout, "service=4:memory:16:primary:true\n");
}

#[test]
fn test_same_package_type_named_like_java_lang_compiles() {
    let Some(javac) = javac() else { return };
    let temp = TempDir::new().unwrap();
    let classes = generate_and_compile(
        javac,
        temp.path(),
        r#"
application = "com.example.shadow.App"

[[steps]]
kind = "literal"
bean = "message"
value = "hello"

[[steps]]
kind = "instance"
bean = "text"
type = "com.example.shadow.String"
args = [{ ref = "message" }]
visibility = "private"

[[steps]]
kind = "lifecycle"
bean = "text"
method = "init"
visibility = "private"
"#,
        &[
            (
                "com/example/shadow/App.java",
                "package com.example.shadow;\n\npublic class App {\n}\n",
            ),
            (
                "com/example/shadow/String.java",
                r#"package com.example.shadow;

public class String {
	private final java.lang.String value;
	private boolean ready;

	private String(java.lang.String value) {
		this.value = value;
	}

	private void init() {
		ready = true;
	}

	@Override
	public java.lang.String toString() {
		return "shadow:" + value + ":" + ready;
	}
}
"#,
            ),
        ],
    );

    let Some(stdout) = launch(
        &classes,
        "com.example.shadow.App__ApplicationContextInitializer",
        &["text"],
    ) else {
        return;
    };
    assert_eq!(stdout, "text=shadow:hello:true\n");
}
