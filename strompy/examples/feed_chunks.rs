// SPDX-License-Identifier: Apache-2.0

// Feed a JSON stream in small chunks from one task and poll completed
// values from another, the way a network client would.

use std::time::Duration;

use strompy::{channel_with, ChannelConfig};

#[tokio::main(flavor = "multi_thread", worker_threads = 2)]
async fn main() {
    env_logger::init();

    let stream = br#"
        {"sensor": "t0", "values": [20.5, 21.0, 21.5]}
        {"sensor": "t1", "values": []}
        [1, 2, 3]
        "done"
    "#;

    let (mut writer, mut reader) = channel_with(ChannelConfig {
        queue_capacity: Some(2),
        ..ChannelConfig::default()
    });

    let feeder = tokio::spawn(async move {
        for chunk in stream.chunks(7) {
            writer.feed_bytes(chunk).await.expect("reader alive");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        writer.close();
    });

    while let Some(result) = reader.poll_next().await {
        match result {
            Ok(value) => println!("value: {value:?}"),
            Err(err) => {
                eprintln!("stream failed: {err}");
                break;
            }
        }
    }

    feeder.await.expect("feeder task");
}
