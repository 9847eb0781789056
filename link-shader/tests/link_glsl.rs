use common::assert_same;
use common::link;
use link_shader::codec::CompactNode;
use link_shader::link_bundle;
use link_shader::link_code;
use link_shader::Bundle;
use link_shader::BundleMap;
use link_shader::CompiledModule;
use link_shader::Defines;
use link_shader::LinkError;
use link_shader::LinkOptions;
use link_shader::Module;
use link_shader::ModuleCache;
use parse_shader::dialect::Dialect;

mod common;

fn glsl(code: &str, libraries: &[(&str, &str)], links: &[(&str, &str)]) -> String {
  link(Dialect::Glsl, code, libraries, links, &Defines::new())
}

#[test]
fn links_an_external() {
  let main = "vec4 getColor();\nvoid main() {\n  gl_FragColor = getColor();\n}\n";
  let color = "#pragma export\nvec4 getColor() { return vec4(1.0, 0.0, 1.0, 1.0); }\n";
  assert_eq!(
    glsl(main, &[], &[("getColor", color)]),
    "#version 450\nvec4 _A_getColor() { return vec4(1.0, 0.0, 1.0, 1.0); }\nvoid main() {\n  gl_FragColor = _A_getColor();\n}"
  );
}

#[test]
fn lifts_a_recursive_dependency() {
  let main = "#version 450\n#pragma import { getColor1 } from 'getColor1'\nvoid main() {\n  gl_FragColor = getColor1();\n}\n";
  let libraries = [
    (
      "getColor1",
      "#pragma import { getColor2 } from 'getColor2'\n#pragma export\nvec4 getColor1() { return getColor2(); }\n",
    ),
    (
      "getColor2",
      "#pragma import { getLifted } from 'getLifted'\n#pragma export\nvec4 getColor2() { return getLifted(); }\n",
    ),
    ("getLifted", "#pragma export\nvec4 getLifted() { return vec4(1.0); }\n"),
  ];
  assert_eq!(
    glsl(main, &libraries, &[]),
    "#version 450\nvec4 _A_getLifted() { return vec4(1.0); }\nvec4 _B_getColor2() { return _A_getLifted(); }\nvec4 _C_getColor1() { return _B_getColor2(); }\nvoid main() {\n  gl_FragColor = _C_getColor1();\n}"
  );
}

#[test]
fn tree_shakes_constants() {
  let main = "#pragma import { getA } from 'lib'\nvoid main() { float a = getA(); }\n";
  let lib = "float x = 1.0;\n#pragma export\nfloat getA() { return x; }\n#pragma export\nfloat getB() { return x; }\n";
  assert_eq!(
    glsl(main, &[("lib", lib)], &[]),
    "#version 450\nfloat _A_x = 1.0;\nfloat _A_getA() { return _A_x; }\nvoid main() { float a = _A_getA(); }"
  );
}

#[test]
fn tree_shakes_around_identifiers() {
  let main = "#pragma import { getB } from 'lib'\nvoid unused() {}\nvoid main() { float b = getB(); }\n";
  let lib = "const float x = 1.0;\nconst float y = 2.0;\n#pragma export\nfloat getA() { return x; }\n#pragma export\nfloat getB() { return y; }\n";
  assert_eq!(
    glsl(main, &[("lib", lib)], &[]),
    "#version 450\nconst float _A_y = 2.0;\nfloat _A_getB() { return _A_y; }\nvoid main() { float b = _A_getB(); }"
  );
}

#[test]
fn shaken_declarations_request_nothing() {
  let main = "#pragma import { getA } from 'a'\nvoid main() { float a = getA(); }\n";
  let a = "#pragma import { heavy } from 'h'\n#pragma export\nfloat getA() { return 1.0; }\n#pragma export\nfloat getX() { return heavy(); }\n";
  let h = "#pragma export\nfloat heavy() { return 2.0; }\n";
  let out = glsl(main, &[("a", a), ("h", h)], &[]);
  assert!(!out.contains("heavy"));
  assert_eq!(
    out,
    "#version 450\nfloat _A_getA() { return 1.0; }\nvoid main() { float a = _A_getA(); }"
  );
}

#[test]
fn shaken_declarations_leave_links_unused() {
  let main = "vec4 getColor();\nvec4 unused() { return getColor(); }\nvoid main() { gl_FragColor = vec4(1.0); }\n";
  let color = "#pragma export\nvec4 getColor() { return vec4(2.0); }\n";
  assert_eq!(
    glsl(main, &[], &[("getColor", color)]),
    "#version 450\nvoid main() { gl_FragColor = vec4(1.0); }"
  );
}

#[test]
fn links_the_same_module_twice() {
  let main = "vec4 getPosition(int index);\nvec4 getColor(int index);\nvoid main() {\n  gl_Position = getPosition(0);\n  gl_FragColor = getColor(0);\n}\n";
  let sub = "float used() { return 1.0; }\n#pragma export\nvec4 getPosition(int index) { return vec4(used()); }\n#pragma export\nvec4 getColor(int index) { return vec4(used(), 0.0, 0.0, 1.0); }\n";
  assert_eq!(
    glsl(main, &[], &[("getPosition", sub), ("getColor", sub)]),
    "#version 450\nfloat _A_used() { return 1.0; }\nvec4 _A_getPosition(int index) { return vec4(_A_used()); }\nfloat _B_used() { return 1.0; }\nvec4 _B_getColor(int index) { return vec4(_B_used(), 0.0, 0.0, 1.0); }\nvoid main() {\n  gl_Position = _A_getPosition(0);\n  gl_FragColor = _B_getColor(0);\n}"
  );
}

#[test]
fn links_a_global_once() {
  let main = "float getPosition();\nfloat getColor();\nvoid main() {\n  gl_FragColor = vec4(getPosition(), getColor(), 0.0, 1.0);\n}\n";
  let sub = "#pragma global\nfloat PI = 3.14;\n#pragma export\nfloat getPosition() { return PI; }\n#pragma export\nfloat getColor() { return PI * 2.0; }\n";
  assert_eq!(
    glsl(main, &[], &[("getPosition", sub), ("getColor", sub)]),
    "#version 450\nfloat PI = 3.14;\nfloat _A_getPosition() { return PI; }\nfloat _B_getColor() { return PI * 2.0; }\nvoid main() {\n  gl_FragColor = vec4(_A_getPosition(), _B_getColor(), 0.0, 1.0);\n}"
  );
}

#[test]
fn links_a_struct_and_a_field() {
  let main = "#pragma import { Light, getLight } from 'light'\nvoid main() { Light l = getLight(); gl_FragColor = vec4(l.pos, 1.0); }\n";
  let light = "#pragma export\nstruct Light { vec3 pos; };\n#pragma export\nLight getLight() { return Light(vec3(1.0)); }\n";
  assert_eq!(
    glsl(main, &[("light", light)], &[]),
    "#version 450\nstruct _A_Light { vec3 pos; };\n_A_Light _A_getLight() { return _A_Light(vec3(1.0)); }\nvoid main() { _A_Light l = _A_getLight(); gl_FragColor = vec4(l.pos, 1.0); }"
  );
}

#[test]
fn hoists_extensions() {
  let main = "#extension GL_EXT_a : require\n#pragma import { getA } from 'lib'\nvoid main() { float a = getA(); }\n";
  let lib = "#extension GL_EXT_b : enable\n#pragma export\nfloat getA() { return 1.0; }\n";
  assert_eq!(
    glsl(main, &[("lib", lib)], &[]),
    "#version 450\n#extension GL_EXT_b : enable\n#extension GL_EXT_a : enable\nfloat _A_getA() { return 1.0; }\nvoid main() { float a = _A_getA(); }"
  );
}

#[test]
fn injects_defines() {
  let main = "void main() { gl_FragColor = vec4(SCALE); }\n";
  let defines: Defines = [("SCALE", "2.0"), ("DEBUG", "false")].into_iter().collect();
  assert_eq!(
    link(Dialect::Glsl, main, &[], &[], &defines),
    "#version 450\n#define SCALE 2.0\nvoid main() { gl_FragColor = vec4(SCALE); }"
  );
}

#[test]
fn overrides_the_preamble() {
  let main = "void main() {}\n";
  let options = LinkOptions::new(Dialect::Glsl).with_preamble("#version 300 es\nprecision highp float;");
  assert_eq!(
    link_code(&options, main, &[], &[], &Defines::new(), None).unwrap(),
    "#version 300 es\nprecision highp float;\nvoid main() {}"
  );
}

#[test]
fn optional_links() {
  let main = "#pragma optional\nfloat getSize();\nvoid main() { float s = getSize(); }\n";
  assert_eq!(
    glsl(main, &[], &[]),
    "#version 450\nvoid main() { float s = getSize(); }"
  );
  let size = "#pragma export\nfloat getSize() { return 2.0; }\n";
  assert_eq!(
    glsl(main, &[], &[("getSize", size)]),
    "#version 450\nfloat _A_getSize() { return 2.0; }\nvoid main() { float s = _A_getSize(); }"
  );
}

#[test]
fn unresolved_link_is_an_error() {
  let main = "vec4 getColor();\nvoid main() { gl_FragColor = getColor(); }\n";
  let options = LinkOptions::new(Dialect::Glsl);
  let err = link_code(&options, main, &[], &[], &Defines::new(), None).unwrap_err();
  assert!(matches!(&err, LinkError::UnresolvedLink { name, .. } if name == "getColor"));
}

#[test]
fn unresolved_import_is_an_error() {
  let main = "#pragma import { getColor } from 'missing'\nvoid main() {}\n";
  let options = LinkOptions::new(Dialect::Glsl);
  let err = link_code(&options, main, &[], &[], &Defines::new(), None).unwrap_err();
  assert_eq!(err.to_string(), "Module 'missing' in 'main' is unknown");
}

#[test]
fn reuses_cached_modules() {
  let main = "#pragma import { getA } from 'lib'\nvoid main() { float a = getA(); }\n";
  let lib = "#pragma export\nfloat getA() { return 1.0; }\n";
  let cache = ModuleCache::default();
  let options = LinkOptions::new(Dialect::Glsl);
  let first = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), Some(&cache)).unwrap();
  assert_eq!(cache.len(), 2);
  let second = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), Some(&cache)).unwrap();
  assert_eq!(cache.len(), 2);
  assert_same(&first, &second);
}

#[test]
fn links_compiled_modules() {
  let main = "#pragma import { getA } from 'lib'\nvoid main() { float a = getA(); }\n";
  let lib = "float x = 1.0;\n#pragma export\nfloat getA() { return x; }\n#pragma export\nfloat getB() { return x; }\n";
  let options = LinkOptions::new(Dialect::Glsl);
  let expected = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), None).unwrap();

  let json = Module::load("lib", lib, Dialect::Glsl, true)
    .unwrap()
    .to_compiled()
    .unwrap()
    .to_json()
    .unwrap();
  let compiled = Module::from_compiled(CompiledModule::from_json(&json).unwrap()).unwrap();
  let mut libraries = BundleMap::new();
  libraries.insert("lib".to_string(), Bundle::new(compiled));
  let root = Bundle::new(Module::load("main", main, Dialect::Glsl, false).unwrap());
  let actual = link_bundle(&options, &root, &libraries).unwrap();
  assert_same(&expected, &actual);
}

#[test]
fn skewed_compiled_module_is_rejected() {
  let lib = "#pragma export\nfloat getA() { return 1.0; }\n";
  let mut compiled = Module::load("lib", lib, Dialect::Glsl, true)
    .unwrap()
    .to_compiled()
    .unwrap();
  compiled.stream.nodes.push(CompactNode(0, 10_000, 1, None));
  let err = Module::from_compiled(compiled).unwrap_err();
  assert!(matches!(err, LinkError::CodecMismatch(_)));
  assert_eq!(err.code(), "LK0003");
}
