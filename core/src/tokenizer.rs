//! Text analysis shared by indexing and query evaluation.
//!
//! Both sides must agree on normalization: a term is looked up exactly as the
//! index stored it, and a mismatch simply misses. Queries always go through
//! the English pipeline; Spanish and French documents are stemmed with their
//! own Snowball algorithm and carry no positions.

use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;

use crate::Position;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref SPANISH_STEMMER: Stemmer = Stemmer::create(Algorithm::Spanish);
    static ref FRENCH_STEMMER: Stemmer = Stemmer::create(Algorithm::French);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","can't","cannot","could","couldn't",
            "did","didn't","do","does","doesn't","doing","don't","down","during",
            "each","few","for","from","further",
            "had","hadn't","has","hasn't","have","haven't","having","he","he'd","he'll","he's","her","here","here's","hers","herself","him","himself","his","how","how's",
            "i","i'd","i'll","i'm","i've","if","in","into","is","isn't","it","it's","its","itself",
            "let's","me","more","most","mustn't","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","ought","our","ours","ourselves","out","over","own",
            "same","she","she'd","she'll","she's","should","shouldn't","so","some","such",
            "than","that","that's","the","their","theirs","them","themselves","then","there","there's","these","they","they'd","they'll","they're","they've","this","those","through","to","too",
            "under","until","up","very",
            "was","wasn't","we","we'd","we'll","we're","we've","were","weren't","what","what's","when","when's","where","where's","which","while","who","who's","whom","why","why's","with","won't","would","wouldn't",
            "you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
    static ref SPANISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","al","algo","algunas","algunos","ante","antes","como","con","contra","cual","cuando",
            "de","del","desde","donde","durante","e","el","ella","ellas","ellos","en","entre","era","es","esa","esas","ese","eso","esos","esta","estar","estas","este","esto","estos",
            "fue","ha","han","hasta","hay","he","la","las","le","les","lo","los",
            "me","mi","mis","mucho","muchos","muy","más","mí","nada","ni","no","nos","nosotros","nuestra","nuestro",
            "o","os","otra","otras","otro","otros","para","pero","poco","por","porque","que","quien","quienes","qué",
            "se","ser","sin","sobre","son","su","sus","sí","también","tanto","te","ti","todo","todos","tu","tus","tú",
            "un","una","uno","unos","vosotros","y","ya","yo","él"
        ];
        words.iter().copied().collect()
    };
    static ref FRENCH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","ai","au","aux","avec","c","ce","ces","d","dans","de","des","du","elle","en","est","et","eux","été",
            "il","j","je","l","la","le","les","leur","lui","m","ma","mais","me","mes","moi","mon","même",
            "n","ne","nos","notre","nous","on","ont","ou","par","pas","pour","qu","que","qui",
            "s","sa","se","ses","son","sont","sur","t","ta","te","tes","toi","ton","tu","un","une","vos","votre","vous","y","à","était"
        ];
        words.iter().copied().collect()
    };
}

/// Document language as far as the analysis pipeline cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
    French,
    Other,
}

/// Guess the language of `text`.
///
/// Short or ambiguous text where the detector is not confident is treated as
/// English, the only language with a positional pipeline.
pub fn detect_language(text: &str) -> Language {
    match whatlang::detect(text) {
        Some(info) if info.is_reliable() => match info.lang() {
            whatlang::Lang::Eng => Language::English,
            whatlang::Lang::Spa => Language::Spanish,
            whatlang::Lang::Fra => Language::French,
            _ => Language::Other,
        },
        _ => Language::English,
    }
}

pub fn is_stopword(token: &str) -> bool { STOPWORDS.contains(token) }

/// Case-fold and stem a single word. Returns `None` for stopwords and for
/// input that contains no word characters.
pub fn normalize_term(word: &str) -> Option<String> {
    tokenize(word).into_iter().next().map(|(term, _)| term)
}

/// Split `text` into `(term, position)` pairs: NFKC, lowercase, stopword
/// removal, Snowball stemming.
///
/// Positions count every word, stopwords included, so the gap between two
/// surviving terms reflects their distance in the original text.
pub fn tokenize(text: &str) -> Vec<(String, Position)> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        .enumerate()
        .filter(|(_, mat)| !is_stopword(mat.as_str()))
        .map(|(pos, mat)| (STEMMER.stem(mat.as_str()).into_owned(), pos as Position))
        .collect()
}

/// Index terms of `text` for a document in `language`, without positions.
/// `Other` yields nothing.
pub fn stem_terms(text: &str, language: Language) -> Vec<String> {
    let (stemmer, stopwords): (&Stemmer, &HashSet<&'static str>) = match language {
        Language::English => return tokenize(text).into_iter().map(|(term, _)| term).collect(),
        Language::Spanish => (&*SPANISH_STEMMER, &*SPANISH_STOPWORDS),
        Language::French => (&*FRENCH_STEMMER, &*FRENCH_STOPWORDS),
        Language::Other => return Vec::new(),
    };
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized)
        // elided articles: l'homme -> homme
        .filter_map(|mat| mat.as_str().rsplit('\'').find(|w| !w.is_empty()))
        .filter(|word| !stopwords.contains(*word))
        .map(|word| stemmer.stem(word).into_owned())
        .collect()
}
