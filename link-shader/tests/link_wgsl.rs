use common::assert_same;
use common::link;
use common::normalize;
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

fn wgsl(code: &str, libraries: &[(&str, &str)], links: &[(&str, &str)]) -> String {
  link(Dialect::Wgsl, code, libraries, links, &Defines::new())
}

#[test]
fn links_an_external() {
  let main = "@link fn getColor() -> vec4<f32>;\nfn main() {\n  let c = getColor();\n}\n";
  let color = "@export fn getColor() -> vec4<f32> {\n  return vec4<f32>(1.0, 0.0, 1.0, 1.0);\n}\n";
  assert_eq!(
    wgsl(main, &[], &[("getColor", color)]),
    "fn _A_getColor() -> vec4<f32> {\n  return vec4<f32>(1.0, 0.0, 1.0, 1.0);\n}\nfn main() {\n  let c = _A_getColor();\n}"
  );
}

#[test]
fn links_an_aliased_external() {
  let main = "@link fn getColor() -> vec4<f32>;\nfn main() {\n  let c = getColor();\n}\n";
  let colors = "@export fn getRed() -> vec4<f32> { return vec4<f32>(1.0, 0.0, 0.0, 1.0); }\n@export fn getBlue() -> vec4<f32> { return vec4<f32>(0.0, 0.0, 1.0, 1.0); }\n";
  assert_eq!(
    wgsl(main, &[], &[("getColor:getBlue", colors)]),
    "fn _A_getBlue() -> vec4<f32> { return vec4<f32>(0.0, 0.0, 1.0, 1.0); }\nfn main() {\n  let c = _A_getBlue();\n}"
  );
}

#[test]
fn substitutes_attributes_and_constants() {
  let main = "@group(GROUP) @binding(BINDING) var<uniform> color: vec4<f32>;\nfn main() {\n  let c = color * SCALE;\n}\n";
  let defines: Defines = [
    ("@group(GROUP)", "@group(0)"),
    ("@binding(BINDING)", "@binding(1)"),
    ("SCALE", "2.0"),
  ]
  .into_iter()
  .collect();
  assert_eq!(
    link(Dialect::Wgsl, main, &[], &[], &defines),
    "const SCALE = 2.0;\n@group(0) @binding(1) var<uniform> color: vec4<f32>;\nfn main() {\n  let c = color * SCALE;\n}"
  );
}

#[test]
fn lifts_a_recursive_dependency() {
  let main = "import { getColor1 } from 'getColor1';\nfn main() {\n  let c = getColor1();\n}\n";
  let libraries = [
    (
      "getColor1",
      "import { getColor2 } from 'getColor2';\n@export fn getColor1() -> vec4<f32> {\n  return getColor2();\n}\n",
    ),
    (
      "getColor2",
      "import { getLifted } from 'getLifted';\n@export fn getColor2() -> vec4<f32> {\n  return getLifted();\n}\n",
    ),
    (
      "getLifted",
      "@export fn getLifted() -> vec4<f32> {\n  return vec4<f32>(1.0);\n}\n",
    ),
  ];
  let out = wgsl(main, &libraries, &[]);
  assert_eq!(
    out,
    "fn _A_getLifted() -> vec4<f32> {\n  return vec4<f32>(1.0);\n}\nfn _B_getColor2() -> vec4<f32> {\n  return _A_getLifted();\n}\nfn _C_getColor1() -> vec4<f32> {\n  return _B_getColor2();\n}\nfn main() {\n  let c = _C_getColor1();\n}"
  );
}

#[test]
fn shared_dependency_is_placed_once_before_its_users() {
  let main = "import { getA } from 'a';\nimport { getB } from 'b';\nfn main() {\n  let v = getA() + getB();\n}\n";
  let libraries = [
    ("a", "import { leaf } from 'leaf';\n@export fn getA() -> f32 { return leaf(); }\n"),
    ("b", "import { leaf } from 'leaf';\n@export fn getB() -> f32 { return leaf(); }\n"),
    ("leaf", "@export fn leaf() -> f32 { return 1.0; }\n"),
  ];
  let out = wgsl(main, &libraries, &[]);
  assert_eq!(out.matches("fn _A_leaf()").count(), 1);
  let leaf = out.find("fn _A_leaf()").unwrap();
  assert!(leaf < out.find("_getA()").unwrap());
  assert!(leaf < out.find("_getB()").unwrap());
}

#[test]
fn tree_shakes_constants() {
  let main = "import { getA } from 'lib';\nfn main() { let a = getA(); }\n";
  let lib = "const x = 1.0;\n@export fn getA() -> f32 { return x; }\n@export fn getB() -> f32 { return x; }\n";
  assert_eq!(
    wgsl(main, &[("lib", lib)], &[]),
    "const _A_x = 1.0;\nfn _A_getA() -> f32 { return _A_x; }\nfn main() { let a = _A_getA(); }"
  );
}

#[test]
fn tree_shakes_around_identifiers() {
  let main = "import { getB } from 'lib';\nfn unused() {}\nfn main() { let b = getB(); }\n";
  let lib = "const x = 1.0;\nconst y = 2.0;\n@export fn getA() -> f32 { return x; }\n@export fn getB() -> f32 { return y; }\n";
  assert_eq!(
    wgsl(main, &[("lib", lib)], &[]),
    "const _A_y = 2.0;\nfn _A_getB() -> f32 { return _A_y; }\nfn main() { let b = _A_getB(); }"
  );
}

#[test]
fn shaken_declarations_request_nothing() {
  let main = "import { getA } from 'a';\nfn main() { let a = getA(); }\n";
  let a = "import { heavy } from 'h';\n@export fn getA() -> f32 { return 1.0; }\n@export fn getX() -> f32 { return heavy(); }\n";
  let h = "@export fn heavy() -> f32 { return 2.0; }\n";
  let out = wgsl(main, &[("a", a), ("h", h)], &[]);
  assert!(!out.contains("heavy"));
  assert_eq!(out, "fn _A_getA() -> f32 { return 1.0; }\nfn main() { let a = _A_getA(); }");
}

#[test]
fn shaken_declarations_leave_links_unused() {
  let main = "@link fn getColor() -> f32;\nfn unused() -> f32 { return getColor(); }\nfn main() { let a = 1.0; }\n";
  let color = "@export fn getColor() -> f32 { return 2.0; }\n";
  assert_eq!(wgsl(main, &[], &[("getColor", color)]), "fn main() { let a = 1.0; }");
}

#[test]
fn links_the_same_module_twice() {
  let main = "@link fn getPosition(index: u32) -> vec4<f32>;\n@link fn getColor(index: u32) -> vec4<f32>;\nfn main() {\n  let p = getPosition(0);\n  let c = getColor(0);\n}\n";
  let sub = "fn used() -> f32 { return 1.0; }\n@export fn getPosition(index: u32) -> vec4<f32> { return vec4<f32>(used()); }\n@export fn getColor(index: u32) -> vec4<f32> { return vec4<f32>(used(), 0.0, 0.0, 1.0); }\n";
  let out = wgsl(main, &[], &[("getPosition", sub), ("getColor", sub)]);
  assert_eq!(
    out,
    "fn _A_used() -> f32 { return 1.0; }\nfn _A_getPosition(index: u32) -> vec4<f32> { return vec4<f32>(_A_used()); }\nfn _B_used() -> f32 { return 1.0; }\nfn _B_getColor(index: u32) -> vec4<f32> { return vec4<f32>(_B_used(), 0.0, 0.0, 1.0); }\nfn main() {\n  let p = _A_getPosition(0);\n  let c = _B_getColor(0);\n}"
  );
}

#[test]
fn links_a_global_once() {
  let main = "@link fn getPosition() -> f32;\n@link fn getColor() -> f32;\nfn main() {\n  let v = getPosition() + getColor();\n}\n";
  let sub = "@global const PI = 3.14;\n@export fn getPosition() -> f32 { return PI; }\n@export fn getColor() -> f32 { return PI * 2.0; }\n";
  let out = wgsl(main, &[], &[("getPosition", sub), ("getColor", sub)]);
  assert_eq!(
    out,
    "const PI = 3.14;\nfn _A_getPosition() -> f32 { return PI; }\nfn _B_getColor() -> f32 { return PI * 2.0; }\nfn main() {\n  let v = _A_getPosition() + _B_getColor();\n}"
  );
}

#[test]
fn links_a_global_across_modules() {
  let main = "import { getA } from 'a';\nimport { Light } from 'light';\nfn main() {\n  let l: Light = getA();\n}\n";
  let libraries = [
    ("a", "import { Light } from 'light';\n@export fn getA() -> Light { return Light(1.0); }\n"),
    ("light", "@global @export struct Light { intensity: f32 };\n"),
  ];
  let out = wgsl(main, &libraries, &[]);
  assert_eq!(out.matches("struct Light").count(), 1);
  assert_eq!(
    out,
    "struct Light { intensity: f32 };\nfn _A_getA() -> Light { return Light(1.0); }\nfn main() {\n  let l: Light = _A_getA();\n}"
  );
}

#[test]
fn links_a_struct_and_a_field() {
  let main = "import { Light, getLight } from 'light';\nfn main() {\n  let l: Light = getLight();\n  let c = l.color;\n}\n";
  let light = "@export struct Light { color: vec4<f32> };\n@export fn getLight() -> Light { return Light(vec4<f32>(1.0)); }\n";
  assert_eq!(
    wgsl(main, &[("light", light)], &[]),
    "struct _A_Light { color: vec4<f32> };\nfn _A_getLight() -> _A_Light { return _A_Light(vec4<f32>(1.0)); }\nfn main() {\n  let l: _A_Light = _A_getLight();\n  let c = l.color;\n}"
  );
}

#[test]
fn hoists_enables() {
  let main = "enable f16;\nimport { getA } from 'lib';\nfn main() { let a = getA(); }\n";
  let lib = "enable f16, subgroups;\n@export fn getA() -> f16 { return f16(1.0); }\n";
  assert_eq!(
    wgsl(main, &[("lib", lib)], &[]),
    "enable f16, subgroups;\nfn _A_getA() -> f16 { return f16(1.0); }\nfn main() { let a = _A_getA(); }"
  );
}

#[test]
fn infers_a_type() {
  let main = "@infer type T;\n@link fn getValue() -> @infer(T) T;\nfn main() {\n  let v: T = getValue();\n}\n";
  let value = "struct Value { x: f32 };\n@export fn getValue() -> Value { return Value(1.0); }\n";
  assert_eq!(
    wgsl(main, &[], &[("getValue", value)]),
    "struct _A_Value { x: f32 };\nfn _A_getValue() -> _A_Value { return _A_Value(1.0); }\nfn main() {\n  let v: _A_Value = _A_getValue();\n}"
  );

  let native = "@export fn getValue() -> f32 { return 1.0; }\n";
  assert_eq!(
    wgsl(main, &[], &[("getValue", native)]),
    "fn _A_getValue() -> f32 { return 1.0; }\nfn main() {\n  let v: f32 = _A_getValue();\n}"
  );
}

#[test]
fn infers_a_parameter_type() {
  let main = "@link fn setValue(@infer(U) value: U);\nfn main() {\n  let v: U = U();\n  setValue(v);\n}\n";
  let sub = "@export fn setValue(value: vec2<f32>) {}\n";
  assert_eq!(
    wgsl(main, &[], &[("setValue", sub)]),
    "fn _A_setValue(value: vec2<f32>) {}\nfn main() {\n  let v: vec2<f32> = vec2<f32>();\n  _A_setValue(v);\n}"
  );
}

#[test]
fn optional_links() {
  let main = "@optional @link fn getSize() -> f32 { return 1.0; };\nfn main() { let s = getSize(); }\n";
  assert_eq!(
    wgsl(main, &[], &[]),
    "fn getSize() -> f32 { return 1.0; };\nfn main() { let s = getSize(); }"
  );
  let size = "@export fn getSize() -> f32 { return 2.0; }\n";
  assert_eq!(
    wgsl(main, &[], &[("getSize", size)]),
    "fn _A_getSize() -> f32 { return 2.0; }\nfn main() { let s = _A_getSize(); }"
  );
}

#[test]
fn unresolved_link_is_an_error() {
  let main = "@link fn getColor() -> vec4<f32>;\nfn main() { let c = getColor(); }\n";
  let options = LinkOptions::new(Dialect::Wgsl);
  let err = link_code(&options, main, &[], &[], &Defines::new(), None).unwrap_err();
  assert!(matches!(&err, LinkError::UnresolvedLink { name, importer } if name == "getColor" && importer == "main"));
  assert_eq!(err.code(), "LK0002");
  assert_eq!(err.to_string(), "Link 'getColor' in 'main' is not linked");
}

#[test]
fn unresolved_import_is_an_error() {
  let main = "import { getColor } from 'missing';\nfn main() { let c = getColor(); }\n";
  let options = LinkOptions::new(Dialect::Wgsl);
  let err = link_code(&options, main, &[], &[], &Defines::new(), None).unwrap_err();
  assert!(matches!(&err, LinkError::UnresolvedImport { module, .. } if module == "missing"));
  assert_eq!(err.code(), "LK0001");
}

#[test]
fn structural_error_aborts_linking() {
  let options = LinkOptions::new(Dialect::Wgsl);
  let err = link_code(&options, "fn broken( {}\n", &[], &[], &Defines::new(), None).unwrap_err();
  assert!(matches!(err, LinkError::Structural(_)));
  assert_eq!(err.code(), "SY0002");
}

#[test]
fn reuses_cached_modules() {
  let main = "import { getA } from 'lib';\nfn main() { let a = getA(); }\n";
  let lib = "@export fn getA() -> f32 { return 1.0; }\n";
  let cache = ModuleCache::default();
  let options = LinkOptions::new(Dialect::Wgsl);
  let first = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), Some(&cache)).unwrap();
  assert_eq!(cache.len(), 2);
  let second = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), Some(&cache)).unwrap();
  assert_eq!(cache.len(), 2);
  assert_same(&first, &second);
}

#[test]
fn links_compiled_modules() {
  let main = "import { getA } from 'lib';\nfn main() { let a = getA(); }\n";
  let lib = "const x = 1.0;\n@export fn getA() -> f32 { return x; }\n@export fn getB() -> f32 { return x; }\n";
  let options = LinkOptions::new(Dialect::Wgsl);
  let expected = link_code(&options, main, &[("lib", lib)], &[], &Defines::new(), None).unwrap();

  let json = Module::load("lib", lib, Dialect::Wgsl, false)
    .unwrap()
    .to_compiled()
    .unwrap()
    .to_json()
    .unwrap();
  let compiled = Module::from_compiled(CompiledModule::from_json(&json).unwrap()).unwrap();
  let mut libraries = BundleMap::new();
  libraries.insert("lib".to_string(), Bundle::new(compiled));
  let root = Bundle::new(Module::load("main", main, Dialect::Wgsl, false).unwrap());
  let actual = link_bundle(&options, &root, &libraries).unwrap();
  assert_same(&expected, &actual);
}

#[test]
fn normalizes_only_namespaces() {
  assert_eq!(normalize("_x_ _1a2b_f _1a2b_g _zzzz9_h a_bcde_i"), "_x_ _A_f _A_g _B_h a_bcde_i");
}
