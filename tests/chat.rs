use image::{GrayImage, Luma};
use rand::{rngs::StdRng, SeedableRng};
use std::{fs, path::Path};
use toponet::{
    chat::{self, ChatSession, DialogueRule, Incoming, Recognizer, ScriptedDialogue},
    classifier::{Classifier, Labels},
    dataset::{ImageVectorizer, Sample, SamplesSet, Vectorizer},
    feedforward::{Net, Topology, TrainerConfig},
};

/// White 32x32 picture with a dark bar inside the square of side `size` at `(x, y)`.
fn symbol(x: u32, y: u32, size: u32, vertical_bar: bool) -> GrayImage {
    let mut image = GrayImage::from_pixel(32, 32, Luma([255]));
    for row in y..y + size {
        for column in x..x + size {
            let inked = if vertical_bar {
                column - x < size / 3
            } else {
                row - y < size / 3
            };
            if inked {
                image.put_pixel(column, row, Luma([0]));
            }
        }
    }
    image
}

fn write_symbol(path: &Path, x: u32, y: u32, size: u32, vertical_bar: bool) {
    symbol(x, y, size, vertical_bar).save(path).unwrap();
}

#[test]
fn guesses_symbol_from_picture() {
    let root = std::env::temp_dir().join(format!("toponet-chat-{}", std::process::id()));
    fs::create_dir_all(&root).unwrap();
    let bar = root.join("bar.png");
    let stripe = root.join("stripe.png");
    write_symbol(&bar, 3, 5, 12, true);
    write_symbol(&stripe, 10, 2, 15, false);

    let vectorizer = ImageVectorizer::new(6, 0.1);
    assert_eq!(vectorizer.vector_len(), 36);

    let mut samples: SamplesSet = [(&bar, 0), (&stripe, 1)]
        .iter()
        .map(|(path, class)| Sample::one_hot(vectorizer.vectorize(path).unwrap(), 2, *class).unwrap())
        .collect();
    let net = Net::new(Topology::new(&[36, 8, 2]).unwrap(), &mut StdRng::seed_from_u64(5));
    let mut trainer = net.build_trainer(
        TrainerConfig {
            learning_rate: 0.5,
            ..TrainerConfig::default()
        },
        StdRng::seed_from_u64(6),
    );
    trainer.train(&mut samples, 2000, 0.01, &mut ()).unwrap();

    let recognizer = Recognizer::new(vectorizer, Labels::new(vec!["tower", "fir"]));
    let mut session = ChatSession::new(ScriptedDialogue::new(vec![DialogueRule::new(
        "hello",
        "Hi there!",
    )]));
    let mut say = |message: Incoming| session.reply(&message, &mut trainer, &recognizer);

    assert_eq!(say(Incoming::Text("/start".to_owned())), chat::GREETING);
    assert_eq!(say(Incoming::Text("Hello.".to_owned())), "Hi there!");
    assert_eq!(say(Incoming::Image(bar.clone())), chat::IMAGE_NOT_REQUESTED);

    say(Incoming::Text("guess sign".to_owned()));
    assert_eq!(
        say(Incoming::Image(bar.clone())),
        "Looks like this symbol is: tower."
    );
    say(Incoming::Text("guess sign".to_owned()));
    assert_eq!(
        say(Incoming::Image(stripe.clone())),
        "Looks like this symbol is: fir."
    );

    say(Incoming::Text("guess sign".to_owned()));
    assert_eq!(
        say(Incoming::Image(root.join("missing.png"))),
        chat::IMAGE_FAILED
    );

    let _ = fs::remove_dir_all(&root);
}

#[test]
fn decoded_picture_matches_file_pipeline() {
    let path = std::env::temp_dir().join(format!("toponet-symbol-{}.png", std::process::id()));
    write_symbol(&path, 4, 4, 9, true);

    let vectorizer = ImageVectorizer::default();
    let image = image::open(&path).unwrap().to_luma8();
    assert_eq!(image, symbol(4, 4, 9, true));
    assert_eq!(
        vectorizer.vectorize(&path).unwrap(),
        vectorizer.vectorize_image(&image)
    );

    let _ = fs::remove_file(&path);
}
