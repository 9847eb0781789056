use parse_shader::dialect::Dialect;
use parse_shader::parse;
use symbol_shader::error::StructuralErrorType;
use symbol_shader::extract;
use symbol_shader::table::DeclarationKind;
use symbol_shader::table::ImportRef;
use symbol_shader::table::InferRef;
use symbol_shader::table::RefFlags;
use symbol_shader::table::SymbolTable;

fn wgsl(source: &str) -> SymbolTable {
  let tree = parse(source, Dialect::Wgsl);
  extract(source, &tree, Dialect::Wgsl, Some("test")).unwrap()
}

fn glsl(source: &str) -> SymbolTable {
  let tree = parse(source, Dialect::Glsl);
  extract(source, &tree, Dialect::Glsl, Some("test")).unwrap()
}

#[test]
fn wgsl_declarations_and_flags() {
  let table = wgsl(
    r#"
    import { getColor, mix as blend } from 'colors';
    use 'colors'::{ getAlpha };
    enable f16;
    @link fn getPosition(index: i32) -> vec4<f32>;
    @optional @link fn getSize() -> f32 {};
    @global @export struct Light { pos: vec3<f32>, color: vec4<f32> };
    @group(0) @binding(1) var<uniform> light: Light;
    const scale = 2.0;
    fn main(@builtin(vertex_index) index: i32) -> @builtin(position) vec4<f32> {
      let p = getPosition(index) * scale;
      return p + light.color + vec4<f32>(getSize());
    }
    "#,
  );

  assert_eq!(table.symbols, vec!["getPosition", "getSize", "Light", "light", "scale", "main"]);
  assert_eq!(table.visibles, vec!["Light", "main"]);
  assert_eq!(table.globals, vec!["Light"]);
  assert_eq!(table.enables, vec!["f16"]);
  assert!(table.is_linkable("getPosition"));
  assert!(table.is_linkable("getSize"));

  assert_eq!(table.modules.len(), 1);
  assert_eq!(table.modules[0].name, "colors");
  assert_eq!(table.modules[0].imports, vec![
    ImportRef {
      name: "getColor".into(),
      imported: "getColor".into()
    },
    ImportRef {
      name: "blend".into(),
      imported: "mix".into()
    },
    ImportRef {
      name: "getAlpha".into(),
      imported: "getAlpha".into()
    },
  ]);

  let size = table.declarations.iter().find(|d| d.symbols == ["getSize"]).unwrap();
  assert_eq!(size.flags, RefFlags::OPTIONAL | RefFlags::EXTERNAL);
  let light = table.declaration("light").unwrap();
  assert!(light.has(RefFlags::BINDING));
  assert_eq!(light.identifiers, vec!["Light"]);
  match &light.kind {
    DeclarationKind::Variable(v) => {
      assert_eq!(v.qualifier.as_deref(), Some("uniform"));
      assert_eq!(v.ty.as_deref(), Some("Light"));
    }
    other => panic!("unexpected {:?}", other),
  }

  let main = table.declaration("main").unwrap();
  assert!(main.has(RefFlags::EXPORTED));
  // Parameter names and member accesses are not references.
  assert_eq!(main.identifiers, vec!["getPosition", "scale", "light", "getSize"]);
  let func = main.function().unwrap();
  assert_eq!(func.ty, "vec4<f32>");
  assert_eq!(func.parameters[0].ty, "i32");
}

#[test]
fn wgsl_struct_members_are_private() {
  let table = wgsl("struct Foo { bar: f32 };\nfn bar() -> Foo { return Foo(1.0); }\n");
  let foo = table.declaration("Foo").unwrap();
  assert!(foo.identifiers.is_empty());
  match &foo.kind {
    DeclarationKind::Struct(s) => assert_eq!(s.members[0].name, "bar"),
    other => panic!("unexpected {:?}", other),
  }
  assert_eq!(table.declaration("bar").unwrap().identifiers, vec!["Foo"]);
}

#[test]
fn wgsl_infer_positions() {
  let table = wgsl(
    "@infer type T;\n@link fn getValue(@infer(U) a: U) -> @infer(T) T;\nfn main() { let v: T = getValue(1); }\n",
  );
  let alias = table.declaration("T").unwrap();
  assert!(alias.has(RefFlags::INFER));
  let ext = table.externals().next().unwrap();
  assert_eq!(ext.function().unwrap().inferred, vec![
    InferRef {
      name: "T".into(),
      at: -1
    },
    InferRef {
      name: "U".into(),
      at: 0
    },
  ]);
}

#[test]
fn glsl_declarations_and_pragmas() {
  let table = glsl(
    r#"
    #version 450
    #extension GL_EXT_shader_16bit_storage : require
    #pragma import { getLifted as lifted } from 'lifted'
    #pragma global
    #pragma export
    float shared_value = 1.0;
    vec4 getColor();
    #pragma optional
    float getSize(int index);
    layout(set = 0, binding = 1) uniform View { mat4 projection; } view;
    uniform Props { float width; };
    struct Light { vec3 pos; };
    void main() {
      gl_Position = view.projection * getColor() * shared_value * width;
    }
    "#,
  );

  assert_eq!(table.symbols, vec![
    "shared_value",
    "getColor",
    "getSize",
    "view",
    "width",
    "Light",
    "main"
  ]);
  assert_eq!(table.globals, vec!["shared_value", "width"]);
  assert_eq!(table.visibles, vec!["shared_value"]);
  assert_eq!(table.enables, vec!["GL_EXT_shader_16bit_storage"]);
  assert_eq!(table.modules[0].name, "lifted");
  assert_eq!(table.modules[0].imports[0].imported, "getLifted");
  assert!(table.is_linkable("getColor"));

  let size = table.externals().find(|d| d.symbols == ["getSize"]).unwrap();
  assert!(size.has(RefFlags::OPTIONAL));
  let view = table.declaration("view").unwrap();
  assert!(view.has(RefFlags::BINDING));
  assert!(matches!(table.declaration("Light").unwrap().kind, DeclarationKind::Struct(_)));

  let main = table.declaration("main").unwrap();
  assert_eq!(main.identifiers, vec!["view", "getColor", "shared_value", "width"]);
}

#[test]
fn glsl_defined_prototype_is_not_external() {
  let table = glsl("float helper(float x);\nvoid main() { helper(1.0); }\nfloat helper(float x) { return x; }\n");
  assert!(table.linkable.is_empty());
  assert_eq!(table.declarations.len(), 3);
}

#[test]
fn error_node_is_structural_error() {
  let source = "const a = 1;\nfn broken( {}\n";
  let tree = parse(source, Dialect::Wgsl);
  let err = extract(source, &tree, Dialect::Wgsl, Some("broken.wgsl")).unwrap_err();
  assert_eq!(err.typ.code(), "SY0002");
  assert!(matches!(err.typ, StructuralErrorType::ErrorNode(Some(_))));
  assert_eq!(&source[err.loc.0..err.loc.1], "fn broken( {}");
  assert!(err.to_string().contains("broken.wgsl:2:1"));
}
