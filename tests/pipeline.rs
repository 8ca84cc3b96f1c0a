//! Pipeline integration tests: source text → tokens → AST → graph → samples.

use assert_approx_eq::assert_approx_eq;

use sapf::dsl::{compile, parse, tokenize, Compiler, TokenKind};
use sapf::dsp::{NoiseColor, Waveform};
use sapf::graph::{Node, Signal};
use sapf::Stage;

const SAMPLE_RATE: f64 = 44100.0;
const SEED: u64 = 42;

#[test]
fn valid_expressions_parse_to_one_root() {
    let sources = [
        "sine(440)",
        "sine(440) * 0.5 + noise() * 0.1",
        "reverb(delay(saw(110), 0.25), 0.4)",
        "-(1 + 2) * 3 / 4",
        "lerp(sine(1), square(2), ramp(0, 1, 3))",
        "sine(440 + sine(5) * 10) // vibrato",
        "/* header */ bandpass(pink(), 1000, 4)",
        "time",
    ];
    for src in sources {
        let tokens = tokenize(src);
        assert_eq!(tokens.last().map(|t| &t.kind), Some(&TokenKind::Eof), "{src}");
        assert!(parse(tokens).is_ok(), "{src}");
        assert!(compile(src, SAMPLE_RATE, SEED).is_ok(), "{src}");
    }
}

#[test]
fn unmatched_paren_reports_parser_stage_at_open_paren() {
    let err = compile("sine(", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Parser);
    assert_eq!(err.offset, 4);
}

#[test]
fn unknown_function_reports_validator_stage() {
    let err = compile("foo(1,2)", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Validator);
    assert_eq!(err.offset, 0);
    assert!(err.message.contains("foo"));
}

#[test]
fn arity_error_reports_expected_and_got() {
    let err = compile("sine(1,2)", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Validator);
    assert_eq!(err.offset, 0);
    assert_eq!(err.message, "'sine' expects 1 argument, got 2");
}

#[test]
fn trailing_tokens_point_at_first_leftover() {
    let err = compile("sine(1))", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Parser);
    assert_eq!(err.offset, 7);

    let err = compile("sine(1) 2", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.offset, 8);
}

#[test]
fn empty_and_comment_only_input() {
    for src in ["", "   ", "// nothing here"] {
        let err = compile(src, SAMPLE_RATE, SEED).unwrap_err();
        assert_eq!(err.stage, Stage::Parser, "{src:?}");
        assert_eq!(err.offset, 0, "{src:?}");
    }
}

#[test]
fn invalid_character_reports_lexer_stage() {
    let err = compile("sine(440) $ 2", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Lexer);
    assert_eq!(err.offset, 10);
}

#[test]
fn sine_graph_shape_and_period() {
    let mut graph = compile("sine(440)", SAMPLE_RATE, SEED).unwrap();
    assert_eq!(
        graph.root_node(),
        &Node::Oscillator {
            waveform: Waveform::Sine,
            frequency: Signal::Constant(440.0)
        }
    );

    let samples = graph.render(2000);
    assert_eq!(samples[0], 0.0);
    let period = SAMPLE_RATE / 440.0;
    for (i, &s) in samples.iter().enumerate() {
        let expected = (2.0 * std::f64::consts::PI * i as f64 / period).sin();
        assert_approx_eq!(s, expected, 1e-9);
    }
}

#[test]
fn noise_is_deterministic_bounded_and_reseedable() {
    let a = compile("noise()", SAMPLE_RATE, SEED).unwrap().render(4096);
    let b = compile("noise()", SAMPLE_RATE, SEED).unwrap().render(4096);
    assert_eq!(a, b);
    assert!(a.iter().all(|s| (-1.0..=1.0).contains(s)));

    let mut g = compile("noise()", SAMPLE_RATE, SEED).unwrap();
    assert_eq!(
        g.root_node(),
        &Node::Noise {
            color: NoiseColor::White
        }
    );
    g.reseed(SEED + 1);
    assert_ne!(g.render(4096), a);
}

#[test]
fn ramp_at_one_kilohertz() {
    let mut g = compile("ramp(0, 1, 1)", 1000.0, SEED).unwrap();
    let s = g.render(1001);
    assert_eq!(s[0], 0.0);
    assert_approx_eq!(s[500], 0.5);
    assert_approx_eq!(s[999], 0.999);
    assert_eq!(s[1000], 1.0);
}

#[test]
fn random_stays_in_unit_interval() {
    let s = compile("random()", SAMPLE_RATE, SEED).unwrap().render(10_000);
    assert!(s.iter().all(|v| (0.0..1.0).contains(v)));
}

#[test]
fn time_drives_modulation() {
    let mut g = compile("time * 2", 100.0, SEED).unwrap();
    let s = g.render(101);
    assert_approx_eq!(s[100], 2.0);
}

#[test]
fn sin_alias_is_the_oscillator() {
    let g = compile("sin(440)", SAMPLE_RATE, SEED).unwrap();
    assert!(matches!(
        g.root_node(),
        Node::Oscillator {
            waveform: Waveform::Sine,
            ..
        }
    ));
}

#[test]
fn delay_time_must_be_constant() {
    let err = compile("delay(sine(440), sine(1))", SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Builder);
    assert_eq!(err.offset, 0);

    assert!(compile("delay(sine(440), 0.5 / 2)", SAMPLE_RATE, SEED).is_ok());
}

#[test]
fn every_builtin_compiles_with_its_usage_arity() {
    for b in sapf::dsl::BUILTINS {
        let args = vec!["0.5"; b.arity].join(", ");
        let src = format!("{}({args})", b.name);
        let mut graph = Compiler::new(SAMPLE_RATE)
            .compile(&src)
            .unwrap_or_else(|e| panic!("{src}: {e}"));
        // No built-in may panic when rendered.
        let _ = graph.render(64);
    }
}

#[test]
fn line_and_column_for_multiline_source() {
    let src = "reverb(\n  sine(440),\n  bogus(1)\n)";
    let err = compile(src, SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Validator);
    assert_eq!(err.line_col(src), (3, 3));
}

#[test]
fn long_flat_sum_is_rejected_not_overflowed() {
    let src = vec!["1"; 200_000].join(" + ");
    let err = compile(&src, SAMPLE_RATE, SEED).unwrap_err();
    assert_eq!(err.stage, Stage::Parser);
    assert_eq!(err.message, "expression nested too deeply");

    let src = vec!["sine(1)"; 100].join(" + ");
    assert!(compile(&src, SAMPLE_RATE, SEED).is_ok());
}

#[test]
fn stateful_effects_recover_from_a_nan_tick() {
    // 0 / 0 at tick 0 only.
    let sources = [
        "reverb(sine(440) / ramp(0, 1, 1), 0.5)",
        "lowpass(sine(440) / ramp(0, 1, 1), 800)",
        "highpass(sine(440) / ramp(0, 1, 1), 800)",
        "bandpass(sine(440) / ramp(0, 1, 1), 800, 2)",
        "delay(sine(440) / ramp(0, 1, 1), 0.01)",
        "chorus(sine(440) / ramp(0, 1, 1), 1, 0.5)",
        "flanger(sine(440) / ramp(0, 1, 1), 1, 0.5)",
        "phaser(sine(440) / ramp(0, 1, 1), 1, 0.5)",
    ];
    for src in sources {
        let mut g = compile(src, 1000.0, SEED).unwrap();
        let s = g.render(5000);
        let finite = s[2000..].iter().filter(|v| v.is_finite()).count();
        assert_eq!(finite, 3000, "{src}");
    }
}
