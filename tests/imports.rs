//! Import resolution: wildcard and named members, error re-emission, and
//! index renumbering across module boundaries.

use chronlang::compiler::compile_module;
use chronlang::resolver::MockResolver;
use chronlang::Module;

const IPA: &str = "\
trait Voicing { *voiceless, voiced }
trait Place { alveolar, palatal, velar }
class C encodes (Voicing, Place) {
  t = (voiceless, alveolar),
  k = (voiceless, velar),
  g = (voiced, velar),
  ʃ = (voiceless, palatal),
}
class V encodes (Voicing) {
  e = (voiced),
  a = (voiced),
}
";

fn resolver() -> MockResolver {
    MockResolver::new()
        .with_source("@core/ipa", IPA)
        .with_source(
            "./norse",
            "import { * } from @core/ipa\n\
             lang ON : Old Norse\n\
             @ 1350, ON\n\
             - I /ek/\n",
        )
        .with_source("./broken", "lang ON\nlang ON\n")
}

fn compile(source: &str) -> Module {
    compile_module(source, "main", &resolver())
}

#[test]
fn wildcard_import_brings_everything() {
    let module = compile("import { * } from @core/ipa\n");
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    assert!(module.has_entity("Voicing"));
    assert!(module.has_entity("C"));
    assert!(module.has_entity("k"));
    assert!(module.feature_by_label("voiced").is_some());
}

#[test]
fn imported_inventory_supports_local_words() {
    let module = compile(
        "import { * } from @core/ipa\n\
         lang ON\n\
         @ 1350, ON\n\
         - I /ek/\n\
         $ k > ʃ\n",
    );
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    let snapshot = module.snapshot("ON", 1400.0);
    assert_eq!(snapshot.word("I").unwrap().render(&module), "eʃ");
}

#[test]
fn named_import_is_selective() {
    let module = compile("import { Voicing } from @core/ipa\n");
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    assert!(module.has_entity("Voicing"));
    assert!(module.feature_by_label("voiced").is_some());
    assert!(!module.has_entity("C"));
    assert!(!module.has_entity("k"));
}

#[test]
fn importing_a_class_brings_its_traits_and_glyphs() {
    let module = compile(
        "import { C } from @core/ipa\n\
         series Voiced = [C+voiced]\n",
    );
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    assert!(module.has_entity("C"));
    assert!(module.has_entity("k"));
    assert!(module.has_entity("Voicing"));
    assert!(!module.has_entity("V"));
}

#[test]
fn missing_named_member_is_an_error() {
    let module = compile("import { Nope } from @core/ipa\n");
    assert!(module.errors.iter().any(|e| e.code == "import_missing"));
}

#[test]
fn unresolvable_module_is_an_error() {
    let module = compile("import { * } from ./nowhere\n");
    assert!(module.errors.iter().any(|e| e.code == "unresolved_import"));
}

#[test]
fn wildcard_mixed_with_named_is_an_error_but_still_imports() {
    let module = compile("import { *, Voicing } from @core/ipa\n");
    assert!(module
        .errors
        .iter()
        .any(|e| e.code == "import_wildcard_mixed"));
    // the wildcard's effect is kept
    assert!(module.has_entity("C"));
}

#[test]
fn imported_errors_carry_both_spans() {
    let module = compile("import { * } from ./broken\n");
    let reemitted = module
        .errors
        .iter()
        .find(|e| e.code == "duplicate_language")
        .expect("expected the imported error to be re-emitted");
    assert_eq!(reemitted.span.source, "main");
    assert_eq!(reemitted.source_span.as_ref().unwrap().source, "./broken");
}

#[test]
fn importing_a_language_brings_its_milestones() {
    let module = compile("import { ON } from ./norse\n");
    assert!(module.has_entity("ON"));
    let on = module.language_by_id("ON").unwrap();
    assert_eq!(module.language(on).milestones.len(), 1);
    assert_eq!(module.milestones.len(), 1);
    assert_eq!(module.milestones[0].starts, 1350.0);
    // the word was not named, so it did not come along
    assert!(module.words.is_empty());
}

#[test]
fn transitive_import_chain_compiles() {
    let module = compile(
        "import { * } from ./norse\n\
         lang EI < ON : Early Icelandic\n\
         @ 1500, EI\n\
         $ k > ʃ\n",
    );
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    // the imported word evolves in the descendant
    let snapshot = module.snapshot("EI", 1600.0);
    assert_eq!(snapshot.word("I").unwrap().render(&module), "eʃ");
}

#[test]
fn phoneme_indices_stay_monotonic_across_imports() {
    let module = compile(
        "import { * } from @core/ipa\n\
         trait Height { high, low }\n\
         class W encodes (Height) { i = (high), o = (low) }\n",
    );
    assert!(module.errors.is_empty(), "{:?}", module.errors);
    let mut indices: Vec<usize> = ["t", "k", "g", "ʃ", "e", "a", "i", "o"]
        .iter()
        .map(|glyph| {
            let id = module.phoneme_by_glyph(glyph).unwrap();
            module.phoneme(id).index
        })
        .collect();
    let sorted = {
        let mut copy = indices.clone();
        copy.sort_unstable();
        copy
    };
    assert_eq!(indices, sorted);
    indices.dedup();
    assert_eq!(indices.len(), 8);
}

#[test]
fn conflicting_import_is_reported() {
    let module = compile(
        "trait Voicing { plain }\n\
         import { Voicing } from @core/ipa\n",
    );
    assert!(module.errors.iter().any(|e| e.code == "duplicate_trait"));
}
