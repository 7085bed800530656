//! Ahead-of-time generation of application context initializers.
//!
//! The generator replays the resolved graph's construction plan as Java
//! statements inside a generated `ApplicationContextInitializer`:
//!
//! ```text
//! literal message = "hello"        →  String message = "hello";
//! instance sampleBean(message)     →  SampleBean sampleBean = new SampleBean(message);
//! lifecycle printMessageOnStartup  →  sampleBean.printMessageOnStartup();
//! ```
//!
//! Accesses to non-public members cannot be written as plain Java. They go
//! through a supporting `ReflectiveAccess` unit, and every such access is
//! recorded as a reflection hint so the closed-world compiler keeps the
//! metadata around.

mod java;

use std::collections::HashMap;

use log::{debug, info};
use thiserror::Error;

use crate::context::GenerationContext;
use crate::graph::{Argument, ConstructionStep, ContributedHint, Injection, Literal, ResolvedGraph};
use crate::hint::{HintRegistry, Member, Mode};
use crate::types::{is_identifier, ClassName, TypeError};
use java::{ImportSet, LocalNames, SourceWriter};

/// Feature suffix of the main generated unit.
pub const INITIALIZER_SUFFIX: &str = "ApplicationContextInitializer";

/// Feature suffix of the reflection helper unit.
pub const REFLECTIVE_ACCESS_SUFFIX: &str = "ReflectiveAccess";

const BEAN_FACTORY_TYPE: &str = "org.springframework.beans.factory.config.ConfigurableListableBeanFactory";
const INITIALIZER_TYPE: &str = "org.springframework.context.ApplicationContextInitializer";
const CONTEXT_TYPE: &str = "org.springframework.context.support.GenericApplicationContext";

/// Errors raised while generating code from a graph.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("unsupported {kind} step #{index} for bean '{bean}': {reason}")]
    UnsupportedStep {
        index: usize,
        bean: String,
        kind: &'static str,
        reason: String,
    },

    #[error("unsupported hint contribution #{index}: {reason}")]
    UnsupportedHint { index: usize, reason: String },

    #[error("invalid generated name: {0}")]
    Naming(#[from] TypeError),
}

/// A generated compilation unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnit {
    pub name: ClassName,
    pub body: String,
}

/// The output of one generation run: the initializer and its supporting units.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedUnits {
    pub main: GeneratedUnit,
    pub supporting: Vec<GeneratedUnit>,
}

impl GeneratedUnits {
    /// All units, main first.
    pub fn iter(&self) -> impl Iterator<Item = &GeneratedUnit> {
        std::iter::once(&self.main).chain(self.supporting.iter())
    }

    pub fn len(&self) -> usize {
        1 + self.supporting.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

/// Generates initializer code for resolved graphs.
#[derive(Debug, Default, Clone, Copy)]
pub struct Generator;

impl Generator {
    pub fn new() -> Self {
        Self
    }

    /// Generate the units for `graph`, recording names and hints in `context`.
    ///
    /// Hints are only committed to the context when the whole graph could be
    /// generated.
    pub fn generate(
        &self,
        graph: &ResolvedGraph,
        context: &mut GenerationContext,
    ) -> Result<GeneratedUnits, GenerationError> {
        let application = &graph.application;
        info!(
            "generating initializer for {} ({} steps)",
            application,
            graph.steps.len()
        );

        let main_name = context
            .naming_mut()
            .generate_name(application, INITIALIZER_SUFFIX)?;

        let mut emitter = InitializerEmitter::new(application, &main_name);
        emitter.prepare(graph);
        for (index, step) in graph.steps.iter().enumerate() {
            emitter.step(index, step, context)?;
        }
        let mut staged = emitter.staged_hints;

        for (index, hint) in graph.hints.iter().enumerate() {
            contribute(index, hint, &mut staged)?;
        }

        // The launcher loads the initializer by name.
        staged.register_reflection(
            main_name.clone(),
            Member::constructor(Vec::new()),
            Mode::Invoke,
            Some(application.clone()),
        );

        let main = GeneratedUnit {
            name: main_name.clone(),
            body: render_initializer(application, &main_name, &emitter.imports, emitter.body),
        };

        let mut supporting = Vec::new();
        if let Some(helper) = emitter.reflective {
            supporting.push(GeneratedUnit {
                body: render_reflective_access(&helper.name, &helper.used, &emitter.imports),
                name: helper.name,
            });
        }

        context.hints_mut().merge(staged);
        debug!(
            "generated {} unit(s), {} hint entries",
            1 + supporting.len(),
            context.hints().len()
        );
        Ok(GeneratedUnits { main, supporting })
    }
}

fn contribute(
    index: usize,
    hint: &ContributedHint,
    staged: &mut HintRegistry,
) -> Result<(), GenerationError> {
    match hint {
        ContributedHint::Reflection {
            ty,
            access,
            mode,
            reachable_if,
            ..
        } => {
            let member = hint
                .reflection_member()
                .ok_or_else(|| GenerationError::UnsupportedHint {
                    index,
                    reason: format!("'{access}' on {ty} needs a reflection access kind and a member name"),
                })?;
            staged.register_reflection(ty.clone(), member, *mode, reachable_if.clone());
        }
        ContributedHint::Resource {
            pattern,
            reachable_if,
        } => {
            if pattern.trim().is_empty() {
                return Err(GenerationError::UnsupportedHint {
                    index,
                    reason: String::from("resource pattern cannot be empty"),
                });
            }
            staged.register_resource(pattern.clone(), reachable_if.clone());
        }
        ContributedHint::Proxy {
            interfaces,
            reachable_if,
        } => {
            if interfaces.is_empty() {
                return Err(GenerationError::UnsupportedHint {
                    index,
                    reason: String::from("a proxy needs at least one interface"),
                });
            }
            staged.register_proxy(interfaces.clone(), reachable_if.clone());
        }
        ContributedHint::Serialization { ty, reachable_if } => {
            staged.register_serialization(ty.clone(), reachable_if.clone());
        }
    }
    Ok(())
}

/// A bean available to later steps.
#[derive(Debug, Clone)]
struct Bean {
    local: String,
    ty: ClassName,
    literal: bool,
}

/// Which helpers of the reflective access unit are used.
#[derive(Debug, Default)]
struct ReflectiveUse {
    instantiate: bool,
    invoke: bool,
    set_field: bool,
}

#[derive(Debug)]
struct ReflectiveHelper {
    name: ClassName,
    used: ReflectiveUse,
}

/// Accumulates the statements of the initializer method.
struct InitializerEmitter<'a> {
    application: &'a ClassName,
    imports: ImportSet,
    locals: LocalNames,
    beans: HashMap<String, Bean>,
    body: Vec<String>,
    staged_hints: HintRegistry,
    reflective: Option<ReflectiveHelper>,
}

impl<'a> InitializerEmitter<'a> {
    fn new(application: &'a ClassName, unit: &ClassName) -> Self {
        Self {
            application,
            imports: ImportSet::new(unit),
            locals: LocalNames::with_reserved(&["context", "beanFactory"]),
            beans: HashMap::new(),
            body: Vec::new(),
            staged_hints: HintRegistry::new(),
            reflective: None,
        }
    }

    /// Claim simple names up front so that the spelling of a type does not
    /// depend on where it is first used.
    fn prepare(&mut self, graph: &ResolvedGraph) {
        for fixed in [BEAN_FACTORY_TYPE, INITIALIZER_TYPE, CONTEXT_TYPE] {
            self.imports.claim(&ClassName::known_qualified(fixed));
        }
        let mut referenced: Vec<ClassName> = Vec::new();
        for step in &graph.steps {
            match step {
                ConstructionStep::Literal { value, .. } => referenced.push(value.java_type().boxed()),
                ConstructionStep::Instance {
                    ty,
                    args,
                    parameter_types,
                    ..
                } => {
                    referenced.push(ty.clone());
                    referenced.extend(parameter_types.iter().flatten().cloned());
                    referenced.extend(args.iter().filter_map(|arg| match arg {
                        Argument::Value(value) => Some(value.java_type()),
                        Argument::Ref(_) => None,
                    }));
                }
                ConstructionStep::Property {
                    value,
                    parameter_type,
                    ..
                } => {
                    referenced.extend(parameter_type.iter().cloned());
                    if let Argument::Value(value) = value {
                        referenced.push(value.java_type());
                    }
                }
                _ => {}
            }
        }
        // java.lang before explicit imports; same-package types still take
        // a java.lang simple name over, as they do in Java.
        referenced.sort_by_key(|ty| !ty.is_implicitly_imported());
        for ty in &referenced {
            self.imports.claim(ty);
        }
    }

    fn step(
        &mut self,
        index: usize,
        step: &ConstructionStep,
        context: &mut GenerationContext,
    ) -> Result<(), GenerationError> {
        let fail = |reason: String| GenerationError::UnsupportedStep {
            index,
            bean: step.bean().to_string(),
            kind: step.kind(),
            reason,
        };
        debug!("step #{index}: {} '{}'", step.kind(), step.bean());

        match step {
            ConstructionStep::Literal { bean, value } => {
                self.ensure_new(bean).map_err(fail)?;
                let ty = value.java_type().boxed();
                let local = self.locals.allocate(bean);
                self.body.push(format!(
                    "{} {} = {};",
                    self.imports.name(&ty),
                    local,
                    java::literal(value)
                ));
                self.body.push(format!(
                    "beanFactory.registerSingleton({}, {local});",
                    java::string_literal(bean)
                ));
                self.register(bean, local, ty, true);
            }

            ConstructionStep::Instance {
                bean,
                ty,
                args,
                parameter_types,
                visibility,
            } => {
                self.ensure_new(bean).map_err(fail)?;
                self.ensure_instantiable(ty).map_err(fail)?;
                let arguments = self.arguments(args).map_err(fail)?;
                let parameters = match parameter_types {
                    Some(declared) if declared.len() != args.len() => {
                        return Err(fail(format!(
                            "{} parameter types declared for {} arguments",
                            declared.len(),
                            args.len()
                        )));
                    }
                    Some(declared) => declared.clone(),
                    None => self.argument_types(args),
                };

                let local = self.locals.allocate(bean);
                let type_name = self.imports.name(ty);
                if visibility.is_public() {
                    self.body.push(format!(
                        "{type_name} {local} = new {type_name}({});",
                        arguments.join(", ")
                    ));
                } else {
                    let helper = self.reflective(context, |used| used.instantiate = true)?;
                    self.body.push(format!(
                        "{type_name} {local} = {helper}.instantiate({type_name}.class, {}{});",
                        self.class_array(&parameters),
                        trailing(&arguments)
                    ));
                    self.staged_hints.register_reflection(
                        ty.clone(),
                        Member::constructor(parameters),
                        Mode::Invoke,
                        Some(self.application.clone()),
                    );
                }
                self.body.push(format!(
                    "beanFactory.registerSingleton({}, {local});",
                    java::string_literal(bean)
                ));
                self.register(bean, local, ty.clone(), false);
            }

            ConstructionStep::Property {
                bean,
                name,
                value,
                injection,
                parameter_type,
                visibility,
            } => {
                let target = self.instance(bean).map_err(fail)?;
                if !is_identifier(name) {
                    return Err(fail(format!("'{name}' is not a valid property name")));
                }
                let argument = self.arguments(std::slice::from_ref(value)).map_err(fail)?;
                let argument = argument.join("");
                let argument_type = match parameter_type {
                    Some(declared) => vec![declared.clone()],
                    None => self.argument_types(std::slice::from_ref(value)),
                };

                match (injection, visibility.is_public()) {
                    (Injection::Setter, true) => self.body.push(format!(
                        "{}.{}({argument});",
                        target.local,
                        java::setter_name(name)
                    )),
                    (Injection::Field, true) => {
                        self.body.push(format!("{}.{name} = {argument};", target.local));
                    }
                    (Injection::Setter, false) => {
                        let setter = java::setter_name(name);
                        let helper = self.reflective(context, |used| used.invoke = true)?;
                        self.body.push(format!(
                            "{helper}.invoke({}.class, {}, {}, {}, {argument});",
                            self.imports.name(&target.ty),
                            target.local,
                            java::string_literal(&setter),
                            self.class_array(&argument_type)
                        ));
                        self.staged_hints.register_reflection(
                            target.ty.clone(),
                            Member::method(setter, argument_type),
                            Mode::Invoke,
                            Some(self.application.clone()),
                        );
                    }
                    (Injection::Field, false) => {
                        let helper = self.reflective(context, |used| used.set_field = true)?;
                        self.body.push(format!(
                            "{helper}.setField({}.class, {}, {}, {argument});",
                            self.imports.name(&target.ty),
                            target.local,
                            java::string_literal(name)
                        ));
                        self.staged_hints.register_reflection(
                            target.ty.clone(),
                            Member::field(name.clone()),
                            Mode::Invoke,
                            Some(self.application.clone()),
                        );
                    }
                }
            }

            ConstructionStep::Lifecycle {
                bean,
                method,
                visibility,
            } => {
                let target = self.instance(bean).map_err(fail)?;
                if !is_identifier(method) {
                    return Err(fail(format!("'{method}' is not a valid method name")));
                }
                if visibility.is_public() {
                    self.body.push(format!("{}.{method}();", target.local));
                } else {
                    let helper = self.reflective(context, |used| used.invoke = true)?;
                    self.body.push(format!(
                        "{helper}.invoke({}.class, {}, {}, {});",
                        self.imports.name(&target.ty),
                        target.local,
                        java::string_literal(method),
                        self.class_array(&[])
                    ));
                    self.staged_hints.register_reflection(
                        target.ty.clone(),
                        Member::method(method.clone(), Vec::new()),
                        Mode::Invoke,
                        Some(self.application.clone()),
                    );
                }
            }

            ConstructionStep::Supplier { ty, .. } => {
                return Err(fail(format!(
                    "instances of {ty} are produced by an instance supplier, which cannot be generated ahead of time"
                )));
            }
        }
        Ok(())
    }

    fn ensure_new(&self, bean: &str) -> Result<(), String> {
        if self.beans.contains_key(bean) {
            return Err(String::from("a bean with this name is already defined"));
        }
        Ok(())
    }

    fn ensure_instantiable(&self, ty: &ClassName) -> Result<(), String> {
        if ty.is_primitive() {
            return Err(format!("cannot instantiate primitive type {ty}"));
        }
        if ty.simple_name().contains('$') {
            return Err(format!("nested type {ty} is not supported"));
        }
        if ty.package().is_empty() && !self.application.package().is_empty() {
            return Err(format!(
                "{ty} is in the default package and cannot be referenced from {}",
                self.application.package()
            ));
        }
        Ok(())
    }

    /// Look up a previously created instance bean.
    fn instance(&self, bean: &str) -> Result<Bean, String> {
        match self.beans.get(bean) {
            None => Err(String::from("the bean is not defined at this point")),
            Some(found) if found.literal => Err(String::from(
                "properties and callbacks require an instance bean, not a literal",
            )),
            Some(found) => Ok(found.clone()),
        }
    }

    fn arguments(&self, args: &[Argument]) -> Result<Vec<String>, String> {
        args.iter()
            .map(|arg| match arg {
                Argument::Value(value) => Ok(java::literal(value)),
                Argument::Ref(name) => self
                    .beans
                    .get(name)
                    .map(|bean| bean.local.clone())
                    .ok_or_else(|| format!("references bean '{name}', which is not defined at this point")),
            })
            .collect()
    }

    /// Parameter types inferred from arguments; call after [`Self::arguments`].
    fn argument_types(&self, args: &[Argument]) -> Vec<ClassName> {
        args.iter()
            .filter_map(|arg| match arg {
                Argument::Value(value) => Some(value.java_type()),
                Argument::Ref(name) => self.beans.get(name).map(|bean| bean.ty.clone()),
            })
            .collect()
    }

    fn class_array(&self, types: &[ClassName]) -> String {
        let class = self.imports.lang("Class");
        if types.is_empty() {
            return format!("new {class}<?>[] {{}}");
        }
        let classes: Vec<String> = types
            .iter()
            .map(|ty| format!("{}.class", self.imports.name(ty)))
            .collect();
        format!("new {class}<?>[] {{ {} }}", classes.join(", "))
    }

    /// Mark a helper of the reflective access unit as used and return how the
    /// unit is spelled. The unit is named on first use.
    fn reflective(
        &mut self,
        context: &mut GenerationContext,
        mark: impl FnOnce(&mut ReflectiveUse),
    ) -> Result<String, GenerationError> {
        let helper = match self.reflective.take() {
            Some(helper) => helper,
            None => {
                let name = context
                    .naming_mut()
                    .generate_name(self.application, REFLECTIVE_ACCESS_SUFFIX)?;
                self.imports.claim(&name);
                ReflectiveHelper {
                    name,
                    used: ReflectiveUse::default(),
                }
            }
        };
        let helper = self.reflective.insert(helper);
        mark(&mut helper.used);
        Ok(self.imports.name(&helper.name))
    }

    fn register(&mut self, bean: &str, local: String, ty: ClassName, literal: bool) {
        self.beans
            .insert(bean.to_string(), Bean { local, ty, literal });
    }
}

fn trailing(arguments: &[String]) -> String {
    arguments.iter().map(|arg| format!(", {arg}")).collect()
}

fn render_initializer(
    application: &ClassName,
    name: &ClassName,
    imports: &ImportSet,
    body: Vec<String>,
) -> String {
    let mut out = SourceWriter::new();
    if !name.package().is_empty() {
        out.line(&format!("package {};", name.package()));
        out.blank();
    }
    for import in imports.imports() {
        out.line(&format!("import {import};"));
    }
    out.blank();

    out.line("/**");
    out.line(&format!(
        " * Initializer for {{@code {}}}, generated ahead of time.",
        application.canonical_name()
    ));
    out.line(" */");
    let initializer = imports.name(&ClassName::known_qualified(INITIALIZER_TYPE));
    let context = imports.name(&ClassName::known_qualified(CONTEXT_TYPE));
    let factory = imports.name(&ClassName::known_qualified(BEAN_FACTORY_TYPE));
    out.open(&format!(
        "public class {} implements {initializer}<{context}>",
        name.simple_name()
    ));
    out.blank();
    out.line(&format!("@{}", imports.lang("Override")));
    out.open(&format!("public void initialize({context} context)"));
    out.line(&format!("{factory} beanFactory = context.getBeanFactory();"));
    for statement in &body {
        out.line(statement);
    }
    out.close();
    out.blank();
    out.close();
    out.finish()
}

/// The helper lives in the initializer's package, so it spells `java.lang`
/// types the way the initializer does.
fn render_reflective_access(name: &ClassName, used: &ReflectiveUse, imports: &ImportSet) -> String {
    let class = imports.lang("Class");
    let object = imports.lang("Object");
    let string = imports.lang("String");
    let failure = imports.lang("IllegalStateException");
    let reflective_failure = imports.lang("ReflectiveOperationException");
    let catch = format!("catch ({reflective_failure} ex)");

    let mut out = SourceWriter::new();
    if !name.package().is_empty() {
        out.line(&format!("package {};", name.package()));
        out.blank();
    }
    if used.instantiate {
        out.line("import java.lang.reflect.Constructor;");
    }
    if used.set_field {
        out.line("import java.lang.reflect.Field;");
    }
    if used.invoke {
        out.line("import java.lang.reflect.Method;");
    }
    out.blank();

    out.line("/**");
    out.line(" * Reflective access to non-public members, generated ahead of time.");
    out.line(" */");
    out.open(&format!("final class {}", name.simple_name()));
    out.blank();
    out.open(&format!("private {}()", name.simple_name()));
    out.close();

    if used.instantiate {
        out.blank();
        out.open(&format!(
            "static <T> T instantiate({class}<T> type, {class}<?>[] parameterTypes, {object}... args)"
        ));
        out.open("try");
        out.line("Constructor<T> constructor = type.getDeclaredConstructor(parameterTypes);");
        out.line("constructor.setAccessible(true);");
        out.line("return constructor.newInstance(args);");
        out.reopen(&catch);
        out.line(&format!(
            "throw new {failure}(\"Failed to instantiate \" + type.getName(), ex);"
        ));
        out.close();
        out.close();
    }

    if used.invoke {
        out.blank();
        out.open(&format!(
            "static void invoke({class}<?> type, {object} target, {string} name, {class}<?>[] parameterTypes, {object}... args)"
        ));
        out.open("try");
        out.line("Method method = type.getDeclaredMethod(name, parameterTypes);");
        out.line("method.setAccessible(true);");
        out.line("method.invoke(target, args);");
        out.reopen(&catch);
        out.line(&format!(
            "throw new {failure}(\"Failed to invoke \" + type.getName() + \".\" + name, ex);"
        ));
        out.close();
        out.close();
    }

    if used.set_field {
        out.blank();
        out.open(&format!(
            "static void setField({class}<?> type, {object} target, {string} name, {object} value)"
        ));
        out.open("try");
        out.line("Field field = type.getDeclaredField(name);");
        out.line("field.setAccessible(true);");
        out.line("field.set(target, value);");
        out.reopen(&catch);
        out.line(&format!(
            "throw new {failure}(\"Failed to set \" + type.getName() + \".\" + name, ex);"
        ));
        out.close();
        out.close();
    }

    out.blank();
    out.close();
    out.finish()
}
