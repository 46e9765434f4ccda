use teleassist_core::routing::{Answer, QueryRequest};

use crate::commands::{assistant, async_runtime, load_config, CommandFailure, CommandResult};

#[derive(Debug, Clone, Default)]
pub struct AskArgs {
    pub email: Option<String>,
    pub channel: Option<String>,
    pub json: bool,
    pub query: String,
}

impl AskArgs {
    fn into_request(self) -> QueryRequest {
        let mut request = QueryRequest::new(self.query);
        if let Some(email) = self.email {
            request = request.from_caller(email);
        }
        if let Some(channel) = self.channel {
            request = request.with_channel_hint(channel);
        }
        request
    }
}

pub fn run(args: AskArgs) -> CommandResult {
    let config = match load_config("ask") {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match async_runtime("ask") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let json_output = args.json;
    let request = args.into_request();
    let result = runtime.block_on(async {
        let assistant = assistant(&config).await?;
        Ok::<Answer, CommandFailure>(assistant.ask(request).await)
    });

    match result {
        Ok(answer) if json_output => render_json(&answer),
        Ok(answer) => CommandResult { exit_code: 0, output: answer.text },
        Err(failure) => CommandResult::from_failure("ask", failure),
    }
}

fn render_json(answer: &Answer) -> CommandResult {
    if answer.is_denied() {
        CommandResult::denied_with_data("ask", answer.text.clone(), answer)
    } else {
        CommandResult::success_with_data("ask", answer.text.clone(), answer)
    }
}
